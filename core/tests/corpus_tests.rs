use fragment_core::corpus::{load_fragments, load_metadata};
use fragment_core::Error;
use std::fs;
use tempfile::tempdir;

#[test]
fn loads_fragments_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("all_fragments.json");
    fs::write(
        &path,
        r#"[{"id":1,"url":"u1","title":"Tabacaria","text":"Não sou nada.","length":0,"excerpt":"Não sou"},
            {"id":2,"url":"u2","title":"Mar","text":"Ó mar salgado"}]"#,
    )
    .unwrap();
    let corpus = load_fragments(&path).unwrap();
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.lookup_by_id(1).unwrap().length, 13);
    assert_eq!(corpus.lookup_by_id(2).unwrap().excerpt, "");
}

#[test]
fn loads_every_json_file_in_a_directory() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.json"), r#"[{"id":1,"text":"um"}]"#).unwrap();
    fs::create_dir(dir.path().join("more")).unwrap();
    fs::write(dir.path().join("more/b.json"), r#"[{"id":2,"text":"dois"}]"#).unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    let corpus = load_fragments(dir.path()).unwrap();
    let ids: Vec<i64> = corpus.fragments().iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn reports_missing_and_malformed_files() {
    let dir = tempdir().unwrap();
    assert!(matches!(load_fragments(dir.path().join("absent.json")), Err(Error::Io { .. })));
    let bad = dir.path().join("bad.json");
    fs::write(&bad, "{not json").unwrap();
    assert!(matches!(load_fragments(&bad), Err(Error::Json { .. })));
}

#[test]
fn metadata_keeps_unknown_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("metadata.json");
    fs::write(&path, r#"{"fragments_count":3,"authors":["Pessoa"],"authors_count":1,"extra_field":true}"#).unwrap();
    let meta = load_metadata(&path).unwrap();
    assert_eq!(meta.fragments_count, 3);
    assert_eq!(meta.authors, vec!["Pessoa"]);
    assert_eq!(meta.extra.get("extra_field"), Some(&serde_json::Value::Bool(true)));
}
