use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn run_cli(args: &[&str]) -> (bool, Value) {
    let output = Command::cargo_bin("citeseek")
        .expect("binary")
        .arg("--quiet")
        .args(args)
        .output()
        .expect("command run");
    let body: Value = if output.stdout.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&output.stdout).expect("valid json")
    };
    (output.status.success(), body)
}

fn write_corpus(dir: &Path) -> String {
    let path = dir.join("corpus.json");
    fs::write(
        &path,
        r#"{
  "schema_version": 1,
  "documents": [
    { "id": "gw", "title": "Grundwasserbericht", "collection_id": "umwelt", "chunks": [
      { "index": 0, "text": "Grundwasser Neubildung" },
      { "index": 1, "text": "Bodenerosion im Hochgebirge" }
    ]},
    { "id": "verkehr", "title": "Verkehrsplan", "collection_id": "stadt", "chunks": [
      { "index": 0, "text": "Radwege und Busspuren" }
    ]}
  ]
}"#,
    )
    .unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn retrieve_prints_numbered_reference_table() {
    let temp = tempdir().unwrap();
    let corpus = write_corpus(temp.path());

    let (ok, body) = run_cli(&["retrieve", "--corpus", &corpus, "Grundwasser Neubildung"]);
    assert!(ok, "{body}");
    assert_eq!(body["subqueries"][0], "Grundwasser Neubildung");
    let references = body["references"].as_array().unwrap();
    assert_eq!(references.len(), 1);
    assert_eq!(references[0]["id"], "1");
    assert_eq!(references[0]["documentId"], "gw");
    assert_eq!(references[0]["snippetLines"][0][0], "Grundwasser Neubildung");
}

#[test]
fn chunks_lists_points_in_scope() {
    let temp = tempdir().unwrap();
    let corpus = write_corpus(temp.path());

    let (ok, body) = run_cli(&["chunks", "--corpus", &corpus, "--collection-id", "stadt"]);
    assert!(ok);
    let chunks = body.as_array().unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0]["documentId"], "verkehr");
}

#[test]
fn check_citations_renumbers_a_saved_draft() {
    let temp = tempdir().unwrap();
    let references = temp.path().join("refs.json");
    fs::write(
        &references,
        r#"[
  { "id": "1", "title": "A", "snippetLines": [["alpha"]], "documentId": "a", "similarityScore": 0.9, "chunkIndex": 0 },
  { "id": "2", "title": "B", "snippetLines": [["beta"]], "documentId": "b", "similarityScore": 0.8, "chunkIndex": 0 },
  { "id": "3", "title": "C", "snippetLines": [["gamma"]], "documentId": "c", "similarityScore": 0.7, "chunkIndex": 4 }
]"#,
    )
    .unwrap();
    let draft = temp.path().join("draft.md");
    fs::write(&draft, "Erstens [3]. Zweitens [1, 3] und [9].\n\nQuellen:\n[1] A").unwrap();

    let (ok, body) = run_cli(&[
        "check-citations",
        "--references",
        references.to_str().unwrap(),
        "--draft",
        draft.to_str().unwrap(),
    ]);
    assert!(ok, "{body}");
    assert_eq!(
        body["answer"],
        "Erstens.⟦cite:1⟧ Zweitens ⟦cite:2⟧⟦cite:1⟧ und."
    );
    assert_eq!(body["needsRepair"], true);
    assert_eq!(body["citations"][0]["documentId"], "c");
    assert_eq!(body["citations"][1]["documentId"], "a");
    assert_eq!(body["issues"].as_array().unwrap().len(), 1);
}

#[test]
fn ask_without_llm_endpoint_fails() {
    let temp = tempdir().unwrap();
    let corpus = write_corpus(temp.path());
    let (ok, _) = run_cli(&["ask", "--corpus", &corpus, "Grundwasser Neubildung"]);
    assert!(!ok);
}
