//! The Calgary container, `spec.md` §8 scenario 5.

extern crate yxdb;

use std::io::Cursor;
use yxdb::calgary::{write_calgary_file_seekable, CalgaryFile};
use yxdb::field::{Field, FieldType, FieldValue};
use yxdb::record::{Record, RecordInfo};

#[test]
fn three_entry_index_yields_three_vectors_concatenating_to_the_full_stream() {
    let schema = RecordInfo::new(vec![
        Field::new("a", FieldType::Int32, None, None).unwrap(),
        Field::new("b", FieldType::String, Some(4), None).unwrap(),
    ])
    .unwrap();

    let blocks: Vec<Vec<Record>> = vec![
        vec![
            vec![Some(FieldValue::Int32(1)), Some(FieldValue::String("aaaa".to_string()))],
            vec![Some(FieldValue::Int32(2)), Some(FieldValue::String("bbbb".to_string()))],
        ],
        vec![vec![Some(FieldValue::Int32(3)), Some(FieldValue::String("cccc".to_string()))]],
        vec![
            vec![Some(FieldValue::Int32(4)), Some(FieldValue::String("dddd".to_string()))],
            vec![Some(FieldValue::Int32(5)), Some(FieldValue::String("eeee".to_string()))],
            vec![Some(FieldValue::Int32(6)), Some(FieldValue::String("ffff".to_string()))],
        ],
    ];

    let mut buf = Vec::new();
    write_calgary_file_seekable(&mut Cursor::new(&mut buf), &schema, &blocks).unwrap();

    let file = CalgaryFile::parse(buf).unwrap();
    assert_eq!(3, file.block_index.len());

    let per_block: Vec<Vec<Record>> = file
        .block_index
        .ranges(file.header.index_position)
        .into_iter()
        .map(|(start, end)| file.block_records(start as usize, end as usize).unwrap())
        .collect();
    assert_eq!(vec![2, 1, 3], per_block.iter().map(Vec::len).collect::<Vec<_>>());

    let concatenated: Vec<Record> = per_block.into_iter().flatten().collect();
    assert_eq!(concatenated, file.records().unwrap());
    assert_eq!(6, concatenated.len());
}
