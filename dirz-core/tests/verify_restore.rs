use dirz_core::codec;
use dirz_core::walk::list_files;
use dirz_core::{
    compress_directory, decompress_archive, read_archive, verify_against_source, verify_archive,
    write_archive, ArchiveError, FileRecord,
};
use std::fs;
use std::path::{Path, PathBuf};

fn sample_tree(root: &Path) -> PathBuf {
    let src = root.join("bbout");
    fs::create_dir_all(src.join("traces/deep")).unwrap();
    fs::write(src.join("summary.json"), "{\"passed\":3}").unwrap();
    fs::write(src.join("traces/t1.log"), "trace one\n".repeat(20)).unwrap();
    fs::write(src.join("traces/deep/t2.bin"), [0u8, 159, 146, 150, 255]).unwrap();
    src
}

fn record_for(data: &[u8], claimed: &[u8]) -> FileRecord {
    let z = codec::gzip(data, 9).unwrap();
    FileRecord {
        content: codec::encode_text(&z),
        original_hash: codec::sha256_hex(claimed),
        original_size: claimed.len() as u64,
        compressed_size: z.len() as u64,
    }
}

#[test]
fn fresh_archive_verifies_against_source() {
    let td = tempfile::tempdir().unwrap();
    let src = sample_tree(td.path());
    let archive = compress_directory(&src, &td.path().join("out")).unwrap();
    let report = verify_against_source(&archive, &src).unwrap();
    assert_eq!(report.files_checked, 3);
}

#[test]
fn modified_source_is_integrity_error() {
    let td = tempfile::tempdir().unwrap();
    let src = sample_tree(td.path());
    let archive = compress_directory(&src, &td.path().join("out")).unwrap();
    fs::write(src.join("traces/t1.log"), "tampered").unwrap();
    let err = verify_against_source(&archive, &src).unwrap_err();
    assert!(matches!(err, ArchiveError::Integrity(ref k) if k == "traces/t1.log"), "{err:?}");
}

#[test]
fn added_source_file_is_count_mismatch() {
    let td = tempfile::tempdir().unwrap();
    let src = sample_tree(td.path());
    let archive = compress_directory(&src, &td.path().join("out")).unwrap();
    fs::write(src.join("late.txt"), "late").unwrap();
    let err = verify_against_source(&archive, &src).unwrap_err();
    assert!(
        matches!(err, ArchiveError::CountMismatch { archived: 3, expected: 4 }),
        "{err:?}"
    );
}

#[test]
fn renamed_key_is_missing_file() {
    let td = tempfile::tempdir().unwrap();
    let src = sample_tree(td.path());
    let archive = compress_directory(&src, &td.path().join("out")).unwrap();

    let mut mf = read_archive(&archive).unwrap();
    let rec = mf.files.remove("summary.json").unwrap();
    mf.files.insert("renamed.json".into(), rec);
    write_archive(&mf, &archive).unwrap();

    let err = verify_against_source(&archive, &src).unwrap_err();
    assert!(matches!(err, ArchiveError::MissingFile(ref k) if k == "summary.json"), "{err:?}");
}

#[test]
fn corrupted_payload_is_decompression_error() {
    let td = tempfile::tempdir().unwrap();
    let src = sample_tree(td.path());
    let archive = compress_directory(&src, &td.path().join("out")).unwrap();

    let mut mf = read_archive(&archive).unwrap();
    let original = fs::read(src.join("summary.json")).unwrap();
    let bad = record_for(b"not the summary", &original);
    mf.files.insert("summary.json".into(), bad);
    write_archive(&mf, &archive).unwrap();

    let files = list_files(&src).unwrap();
    let err = verify_archive(&archive, &files, &src).unwrap_err();
    assert!(matches!(err, ArchiveError::Decompression(ref k) if k == "summary.json"), "{err:?}");
}

#[test]
fn restore_rejects_record_that_does_not_match_its_hash() {
    let td = tempfile::tempdir().unwrap();
    let src = sample_tree(td.path());
    let archive = compress_directory(&src, &td.path().join("out")).unwrap();

    let mut mf = read_archive(&archive).unwrap();
    // Sorts after every real key, so the genuine files are restored first.
    mf.files.insert("zz_liar.txt".into(), record_for(b"actual", b"claimed"));
    write_archive(&mf, &archive).unwrap();

    let out = td.path().join("restored");
    let err = dirz_core::decompress_archive_with(
        &archive,
        &out,
        &dirz_core::RestoreOptions { jobs: 1, progress: None },
    )
    .unwrap_err();
    assert!(matches!(err, ArchiveError::Decompression(ref k) if k == "zz_liar.txt"), "{err:?}");
    // No rollback: earlier files remain.
    assert_eq!(fs::read_to_string(out.join("summary.json")).unwrap(), "{\"passed\":3}");
}

#[test]
fn restore_rejects_non_gzip_payload() {
    let td = tempfile::tempdir().unwrap();
    let src = sample_tree(td.path());
    let archive = compress_directory(&src, &td.path().join("out")).unwrap();
    let mut mf = read_archive(&archive).unwrap();
    mf.files.get_mut("summary.json").unwrap().content = codec::encode_text(b"plain bytes");
    write_archive(&mf, &archive).unwrap();

    let err = decompress_archive(&archive, &td.path().join("r")).unwrap_err();
    assert!(matches!(err, ArchiveError::Decompression(_)), "{err:?}");
}

#[test]
fn non_base64_payload_is_decompression_error_in_verify_and_restore() {
    let td = tempfile::tempdir().unwrap();
    let src = sample_tree(td.path());
    let archive = compress_directory(&src, &td.path().join("out")).unwrap();
    let mut mf = read_archive(&archive).unwrap();
    mf.files.get_mut("summary.json").unwrap().content = "%%% not base64 %%%".into();
    write_archive(&mf, &archive).unwrap();

    let err = verify_against_source(&archive, &src).unwrap_err();
    assert!(matches!(err, ArchiveError::Decompression(ref k) if k == "summary.json"), "{err:?}");

    let err = decompress_archive(&archive, &td.path().join("r")).unwrap_err();
    assert!(matches!(err, ArchiveError::Decompression(ref k) if k == "summary.json"), "{err:?}");
}

#[test]
fn restore_rejects_traversal_before_writing_anything() {
    let td = tempfile::tempdir().unwrap();
    let src = sample_tree(td.path());
    let archive = compress_directory(&src, &td.path().join("out")).unwrap();
    let mut mf = read_archive(&archive).unwrap();
    mf.files.insert("../escape.txt".into(), record_for(b"x", b"x"));
    write_archive(&mf, &archive).unwrap();

    let out = td.path().join("restored");
    let err = decompress_archive(&archive, &out).unwrap_err();
    assert!(matches!(err, ArchiveError::UnsafePath(_)), "{err:?}");
    assert!(!td.path().join("escape.txt").exists());
    assert!(!out.join("summary.json").exists());
}

#[test]
fn missing_archive_is_not_found() {
    let td = tempfile::tempdir().unwrap();
    let err = decompress_archive(&td.path().join("nope.gz"), &td.path().join("o")).unwrap_err();
    assert!(matches!(err, ArchiveError::NotFound(_)), "{err:?}");
}

#[test]
fn restoring_twice_yields_identical_trees() {
    let td = tempfile::tempdir().unwrap();
    let src = sample_tree(td.path());
    let archive = compress_directory(&src, &td.path().join("out")).unwrap();
    let a = decompress_archive(&archive, &td.path().join("one")).unwrap();
    let b = decompress_archive(&archive, &td.path().join("two")).unwrap();

    let fa = list_files(&a).unwrap();
    let fb = list_files(&b).unwrap();
    assert_eq!(fa.len(), fb.len());
    for (x, y) in fa.iter().zip(&fb) {
        assert_eq!(x.strip_prefix(&a).unwrap(), y.strip_prefix(&b).unwrap());
        assert_eq!(fs::read(x).unwrap(), fs::read(y).unwrap());
    }
    // The archive itself is untouched by restores.
    assert!(verify_against_source(&archive, &src).is_ok());
}
