//! Segment layout must never be observable through the reader/writer API.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tidemark_io::{
    encode_to_vec, Guid, IOReader, IOWriter, LockState, SegmentPool, SegmentedBuffer,
};

/// One value of every shape the codec knows.
#[derive(Clone, Debug, PartialEq)]
enum Value {
    U32(u32),
    I64(i64),
    VarUInt(u32),
    VarLong(i64),
    VarU128(u128),
    Text(Option<String>),
    Bytes(Option<Vec<u8>>),
    Guid(Option<Guid>),
    Bool(bool),
}

fn random_value(rng: &mut StdRng) -> Value {
    match rng.gen_range(0..9) {
        0 => Value::U32(rng.gen()),
        1 => Value::I64(rng.gen()),
        2 => Value::VarUInt(rng.gen::<u32>() >> rng.gen_range(0..32)),
        3 => Value::VarLong(rng.gen::<i64>() >> rng.gen_range(0..64)),
        4 => Value::VarU128(rng.gen::<u128>() >> rng.gen_range(0..128)),
        5 => {
            if rng.gen_bool(0.1) {
                Value::Text(None)
            } else {
                let len = rng.gen_range(0..150);
                let text: String = (0..len)
                    .map(|_| ['a', 'é', '字', '🌊'][rng.gen_range(0..4)])
                    .collect();
                Value::Text(Some(text))
            }
        }
        6 => {
            if rng.gen_bool(0.1) {
                Value::Bytes(None)
            } else {
                let len = rng.gen_range(0..300);
                Value::Bytes(Some((0..len).map(|_| rng.gen()).collect()))
            }
        }
        7 => {
            if rng.gen_bool(0.2) {
                Value::Guid(None)
            } else {
                Value::Guid(Some(Guid::from_u128(rng.gen())))
            }
        }
        _ => Value::Bool(rng.gen()),
    }
}

fn write_value(writer: &mut IOWriter<'_>, value: &Value) {
    match value {
        Value::U32(v) => writer.write_u32(*v),
        Value::I64(v) => writer.write_i64(*v),
        Value::VarUInt(v) => writer.write_var_uint(*v),
        Value::VarLong(v) => writer.write_var_long(*v),
        Value::VarU128(v) => writer.write_var_u128(*v),
        Value::Text(v) => writer.write_string(v.as_deref()),
        Value::Bytes(v) => writer.write_byte_string(v.as_deref()),
        Value::Guid(v) => writer.write_nullable_guid(v.as_ref()),
        Value::Bool(v) => writer.write_bool(*v),
    }
}

fn read_value(reader: &mut IOReader<'_>, shape: &Value) -> Value {
    match shape {
        Value::U32(_) => Value::U32(reader.read_u32().unwrap()),
        Value::I64(_) => Value::I64(reader.read_i64().unwrap()),
        Value::VarUInt(_) => Value::VarUInt(reader.read_var_uint().unwrap()),
        Value::VarLong(_) => Value::VarLong(reader.read_var_long().unwrap()),
        Value::VarU128(_) => Value::VarU128(reader.read_var_u128().unwrap()),
        Value::Text(_) => Value::Text(reader.read_string(4096).unwrap()),
        Value::Bytes(_) => Value::Bytes(reader.read_byte_string(4096).unwrap()),
        Value::Guid(_) => Value::Guid(reader.read_nullable_guid().unwrap()),
        Value::Bool(_) => Value::Bool(reader.read_bool().unwrap()),
    }
}

fn random_values(seed: u64, count: usize) -> Vec<Value> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| random_value(&mut rng)).collect()
}

#[test]
fn test_write_identical_for_any_segment_size() {
    let values = random_values(0x7157, 400);
    let reference = encode_to_vec(|w| values.iter().for_each(|v| write_value(w, v)));

    for segment_size in [1, 2, 3, 7, 16, 64, 4096] {
        let mut buffer = SegmentedBuffer::with_segment_size(segment_size);
        {
            let mut writer = IOWriter::new(&mut buffer);
            for value in &values {
                write_value(&mut writer, value);
            }
            assert_eq!(writer.finish(), reference.len());
        }
        assert_eq!(buffer.to_vec(), reference, "segment size {segment_size}");
        assert_eq!(buffer.lock_state(), LockState::Unlocked);
    }
}

#[test]
fn test_read_identical_for_any_split() {
    let values = random_values(0xBEEF, 300);
    let bytes = encode_to_vec(|w| values.iter().for_each(|v| write_value(w, v)));
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..20 {
        // Random cut points, including empty chunks.
        let mut cuts: Vec<usize> = (0..rng.gen_range(1..40))
            .map(|_| rng.gen_range(0..=bytes.len()))
            .collect();
        cuts.sort_unstable();
        let mut chunks: Vec<&[u8]> = Vec::new();
        let mut start = 0;
        for cut in cuts {
            chunks.push(&bytes[start..cut]);
            start = cut;
        }
        chunks.push(&bytes[start..]);

        let buffer = SegmentedBuffer::from_chunks(&chunks);
        assert_eq!(buffer.len(), bytes.len());
        let mut reader = IOReader::from_buffer(&buffer);
        for value in &values {
            assert_eq!(&read_value(&mut reader, value), value);
        }
        assert!(reader.is_at_end());
    }
}

#[test]
fn test_one_byte_segments() {
    let values = random_values(3, 50);
    let bytes = encode_to_vec(|w| values.iter().for_each(|v| write_value(w, v)));
    let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
    let buffer = SegmentedBuffer::from_chunks(&chunks);
    let mut reader = IOReader::from_buffer(&buffer);
    for value in &values {
        assert_eq!(&read_value(&mut reader, value), value);
    }
}

#[test]
fn test_pooled_buffers_reuse_memory() {
    let pool = Arc::new(SegmentPool::new(16));
    let values = random_values(9, 100);
    let reference = encode_to_vec(|w| values.iter().for_each(|v| write_value(w, v)));

    for _ in 0..3 {
        let mut buffer = SegmentedBuffer::with_pool(Arc::clone(&pool), 32);
        {
            let mut writer = IOWriter::new(&mut buffer);
            for value in &values {
                write_value(&mut writer, value);
            }
        }
        assert_eq!(buffer.to_vec(), reference);
        buffer.dispose();
        assert!(pool.pooled_count() > 0);
    }
}

#[test]
fn test_clear_then_rewrite() {
    let mut buffer = SegmentedBuffer::with_segment_size(8);
    {
        let mut writer = IOWriter::new(&mut buffer);
        writer.write_str("first payload spanning segments");
    }
    buffer.clear();
    assert!(buffer.is_empty());
    {
        let mut writer = IOWriter::new(&mut buffer);
        writer.write_str("second");
    }
    let mut reader = IOReader::from_buffer(&buffer);
    assert_eq!(reader.read_required_string(64).unwrap(), "second");
    assert!(reader.is_at_end());
}
