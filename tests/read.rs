use std::path::Path;
use std::sync::Arc;

use z5::storage::FilesystemStore;
use z5::{DataType, Dataset, FillValue, Flavor, OpenMode};

fn store(dir: &Path) -> Arc<FilesystemStore> {
    env_logger::try_init().ok();
    Arc::new(FilesystemStore::new(dir).expect("should be able to create store"))
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) {
    let path = dir.join(name);
    std::fs::create_dir_all(path.parent().expect("file has a parent")).expect("create directory");
    std::fs::write(path, bytes).expect("write file");
}

fn open(dir: &Path, name: &str, flavor: Flavor) -> Dataset {
    Dataset::open(store(dir), name, flavor, OpenMode::ReadOnly).expect("open dataset")
}

const N5_INT16: &str = r#"{
    "dimensions": [3, 2],
    "blockSize": [3, 2],
    "dataType": "int16",
    "compression": {"type": "raw"}
}"#;

#[test]
fn test_n5_single_chunk() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "arr.n5/attributes.json", N5_INT16.as_bytes());
    let mut chunk = vec![0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 2];
    chunk.extend([0, 1, 0xff, 0xfe, 0, 3, 0xff, 0xfc, 0, 5, 0xff, 0xfa]);
    write_file(dir.path(), "arr.n5/0/0", &chunk);

    let ds = open(dir.path(), "arr.n5", Flavor::N5);
    assert_eq!(ds.shape(), &[2, 3]);
    assert_eq!(ds.data_type(), DataType::Int16);
    assert_eq!(ds.compressor_name(), "raw");
    assert_eq!(ds.chunk_byte_size(&[0, 0]).unwrap(), 24);

    let mut out = [0i16; 6];
    let is_varlen = ds.read_chunk(&[0, 0], &mut out).unwrap();
    assert!(!is_varlen);
    assert_eq!(out, [1, -2, 3, -4, 5, -6]);
}

#[cfg(feature = "gzip")]
#[test]
fn test_n5_gzip() {
    use z5::Compression;
    use z5::codec::create_codec;

    let dir = tempfile::tempdir().unwrap();
    let attrs = N5_INT16.replace(r#"{"type": "raw"}"#, r#"{"type": "gzip", "level": 4}"#);
    write_file(dir.path(), "gz.n5/attributes.json", attrs.as_bytes());

    let codec = create_codec(&Compression::Gzip {
        level: 4,
        use_zlib: false,
    })
    .unwrap();
    let payload: Vec<u8> = [7i16, 8, 9, 10, 11, 12]
        .iter()
        .flat_map(|v| v.to_be_bytes())
        .collect();
    let mut chunk = vec![0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 2];
    chunk.extend(codec.encode(&payload).unwrap());
    write_file(dir.path(), "gz.n5/0/0", &chunk);

    let ds = open(dir.path(), "gz.n5", Flavor::N5);
    assert_eq!(ds.compressor_name(), "gzip");
    let data: Vec<i16> = ds.read_chunk_varlen(&[0, 0]).unwrap();
    assert_eq!(data, vec![7, 8, 9, 10, 11, 12]);
}

#[cfg(feature = "gzip")]
#[test]
fn test_oversized_gzip_chunk() {
    use z5::Compression;
    use z5::codec::{CodecError, create_codec};

    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "big/.zarray",
        br#"{
            "shape": [4],
            "chunks": [4],
            "dtype": "|u1",
            "compressor": {"id": "gzip", "level": 9},
            "fill_value": 0
        }"#,
    );
    let codec = create_codec(&Compression::Gzip {
        level: 9,
        use_zlib: false,
    })
    .unwrap();
    // inflates to far more than the four bytes of the chunk
    write_file(dir.path(), "big/0", &codec.encode(&vec![1u8; 64 << 20]).unwrap());

    let ds = open(dir.path(), "big", Flavor::Zarr);
    let mut out = [0u8; 4];
    assert!(matches!(
        ds.read_chunk(&[0], &mut out),
        Err(z5::Error::Codec(CodecError::UnexpectedDecodedSize {
            expected: 4,
            actual: 5
        }))
    ));
    assert!(matches!(
        ds.read_chunk_varlen::<u8>(&[0]),
        Err(z5::Error::Codec(CodecError::UnexpectedDecodedSize { .. }))
    ));
}

#[test]
fn test_n5_varlen_chunk() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "v/attributes.json",
        br#"{
            "dimensions": [8],
            "blockSize": [4],
            "dataType": "uint8",
            "compression": {"type": "raw"}
        }"#,
    );
    let mut chunk = vec![0, 1, 0, 1, 0, 0, 0, 4, 0, 0, 0, 6];
    chunk.extend([10, 11, 12, 13, 14, 15]);
    write_file(dir.path(), "v/1", &chunk);

    let ds = open(dir.path(), "v", Flavor::N5);
    assert_eq!(ds.check_varlen_chunk(&[1]).unwrap(), (true, 6));
    assert_eq!(ds.check_varlen_chunk(&[0]).unwrap(), (false, 4));
    assert_eq!(
        ds.read_chunk_varlen::<u8>(&[1]).unwrap(),
        vec![10, 11, 12, 13, 14, 15]
    );

    let mut too_small = [0u8; 4];
    assert!(matches!(
        ds.read_chunk(&[1], &mut too_small),
        Err(z5::Error::InvalidChunk(_))
    ));
    let mut out = [0u8; 8];
    assert!(ds.read_chunk(&[1], &mut out).unwrap());
    assert_eq!(out, [10, 11, 12, 13, 14, 15, 0, 0]);
}

#[test]
fn test_n5_corrupt_header() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "arr.n5/attributes.json", N5_INT16.as_bytes());
    // rank 3 header in a rank 2 dataset
    write_file(
        dir.path(),
        "arr.n5/0/0",
        &[0, 1, 0, 3, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0],
    );

    let ds = open(dir.path(), "arr.n5", Flavor::N5);
    assert!(matches!(
        ds.check_varlen_chunk(&[0, 0]),
        Err(z5::Error::CorruptChunk(_))
    ));
    let mut out = [0i16; 6];
    assert!(matches!(
        ds.read_chunk(&[0, 0], &mut out),
        Err(z5::Error::CorruptChunk(_))
    ));
}

#[test]
fn test_zarr_big_endian() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "z/.zarray",
        br#"{
            "zarr_format": 2,
            "shape": [4, 4],
            "chunks": [2, 2],
            "dtype": ">u4",
            "compressor": null,
            "fill_value": 7,
            "order": "C",
            "filters": null
        }"#,
    );
    write_file(
        dir.path(),
        "z/0.1",
        &[0, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 0],
    );

    let ds = open(dir.path(), "z", Flavor::Zarr);
    assert_eq!(ds.fill_value(), &FillValue::from(7u32));
    assert_eq!(ds.check_varlen_chunk(&[0, 1]).unwrap(), (false, 4));

    let mut out = [0u32; 4];
    assert!(!ds.read_chunk(&[0, 1], &mut out).unwrap());
    assert_eq!(out, [1, 1 << 8, 1 << 16, 1 << 24]);

    assert!(!ds.chunk_exists(&[1, 1]).unwrap());
    assert!(matches!(
        ds.read_chunk(&[1, 1], &mut out),
        Err(z5::Error::MissingChunk(_))
    ));
}

#[test]
fn test_zarr_nested() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "nested/.zarray",
        br#"{
            "shape": [3, 2],
            "chunks": [2, 2],
            "dtype": "|i1",
            "compressor": null,
            "fill_value": null,
            "dimension_separator": "/"
        }"#,
    );
    write_file(dir.path(), "nested/1/0", &[0xff, 2]);

    let ds = open(dir.path(), "nested", Flavor::Zarr);
    assert_eq!(ds.chunk_shape(&[1, 0]).unwrap(), vec![1, 2]);
    assert_eq!(ds.read_chunk_varlen::<i8>(&[1, 0]).unwrap(), vec![-1, 2]);
}

#[test]
fn test_missing_metadata() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Dataset::open(store(dir.path()), "nothing", Flavor::N5, OpenMode::ReadOnly),
        Err(z5::Error::InvalidMetadata(_))
    ));
}

#[test]
fn test_read_only_store_access() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "arr.n5/attributes.json", N5_INT16.as_bytes());
    let ds = open(dir.path(), "arr.n5", Flavor::N5);
    assert!(matches!(
        ds.write_chunk(&[0, 0], &[1i16; 6]),
        Err(z5::Error::ReadOnlyMode(OpenMode::ReadOnly))
    ));
    assert!(!dir.path().join("arr.n5/0/0").exists());
}
