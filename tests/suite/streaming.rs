//! Real analyzer processes: stdin streaming, invocation and report delivery.

use flint_check::{CheckController, CheckerConfig, RunState};
use flint_types::Severity;

use crate::common::{
    WAIT, controller, deliveries, document, fake_analyzer, recorder, reporting_analyzer, settle,
};

#[tokio::test]
async fn report_is_parsed_and_delivered() {
    let tmp = tempfile::tempdir().unwrap();
    let analyzer = reporting_analyzer(
        tmp.path(),
        "\n/app/a.js\n  2:7  error  'value' is not defined  no-undef\n\n1 problem\n",
    );
    let mut controller = controller(analyzer);
    let (delivered, report) = recorder();

    let text = "let a = 1;\nconst value2 = value;\n";
    controller
        .check_document(document(1, tmp.path(), "a.js", text), report)
        .unwrap();
    let outcome = tokio::time::timeout(WAIT, controller.next_completion())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.state, RunState::Completed);

    let delivered = deliveries(&delivered);
    assert_eq!(delivered.len(), 1);
    let diagnostics = &delivered[0];
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity(), Severity::Error);
    assert_eq!(diagnostics[0].rule(), Some("no-undef"));
    assert_eq!(
        diagnostics[0].message(),
        "error: 'value' is not defined [no-undef]"
    );
    assert_eq!(&text[diagnostics[0].range()], "value2");
}

#[tokio::test]
async fn document_text_reaches_stdin() {
    let tmp = tempfile::tempdir().unwrap();
    let analyzer = fake_analyzer(
        tmp.path(),
        r#"n=$(wc -c | tr -d ' ')
echo "1:1  warning  read $n bytes  stdin-size""#,
    );
    let mut controller = controller(analyzer);
    let (delivered, report) = recorder();

    let text = "x".repeat(1234);
    controller
        .check_document(document(1, tmp.path(), "a.js", &text), report)
        .unwrap();
    settle(&mut controller).await;

    let delivered = deliveries(&delivered);
    assert_eq!(
        delivered[0][0].message(),
        "warning: read 1234 bytes [stdin-size]"
    );
}

#[tokio::test]
async fn large_document_does_not_stall_a_chatty_analyzer() {
    let tmp = tempfile::tempdir().unwrap();
    // Floods stdout before touching stdin, so writing and reading must
    // overlap or both sides block on full pipes.
    let analyzer = fake_analyzer(
        tmp.path(),
        r#"i=0
while [ $i -lt 4000 ]; do
  echo "1:1  warning  filler line number $i  filler"
  i=$((i + 1))
done
n=$(wc -c | tr -d ' ')
echo "1:1  error  read $n bytes  stdin-size""#,
    );
    let mut controller = controller(analyzer);
    let (delivered, report) = recorder();

    let text = "a".repeat(512 * 1024);
    controller
        .check_document(document(1, tmp.path(), "big.js", &text), report)
        .unwrap();
    settle(&mut controller).await;

    let delivered = deliveries(&delivered);
    let diagnostics = &delivered[0];
    assert_eq!(diagnostics.len(), 4001);
    assert_eq!(
        diagnostics[4000].message(),
        format!("error: read {} bytes [stdin-size]", text.len())
    );
}

#[tokio::test]
async fn invocation_passes_path_and_extra_args() {
    let tmp = tempfile::tempdir().unwrap();
    let analyzer = fake_analyzer(
        tmp.path(),
        r#"cat >/dev/null
echo "1:1  warning  $*  argv""#,
    );
    let config = CheckerConfig::new(analyzer)
        .with_extra_args(vec!["--rule".to_string(), "semi: error".to_string()]);
    let mut controller = CheckController::new(config);
    let (delivered, report) = recorder();

    let doc = document(1, tmp.path(), "a.js", "let a\n");
    let path = doc.path().display().to_string();
    controller.check_document(doc, report).unwrap();
    settle(&mut controller).await;

    let delivered = deliveries(&delivered);
    assert_eq!(
        delivered[0][0].message(),
        format!(
            "warning: --no-color --no-ignore --stdin --stdin-filename {path} --rule semi: error [argv]"
        )
    );
}

#[tokio::test]
async fn runs_in_document_directory_by_default() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    std::fs::create_dir(&src).unwrap();
    let analyzer = fake_analyzer(
        tmp.path(),
        r#"cat >/dev/null
echo "1:1  warning  $(pwd -P)  cwd""#,
    );
    let mut controller = controller(analyzer);
    let (delivered, report) = recorder();

    controller
        .check_document(document(1, &src, "a.js", "x"), report)
        .unwrap();
    settle(&mut controller).await;

    let expected = src.canonicalize().unwrap();
    assert_eq!(
        deliveries(&delivered)[0][0].message(),
        format!("warning: {} [cwd]", expected.display())
    );
}

#[tokio::test]
async fn runs_in_configured_project_root() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("project");
    let src = root.join("lib");
    std::fs::create_dir_all(&src).unwrap();
    let analyzer = fake_analyzer(
        tmp.path(),
        r#"cat >/dev/null
echo "1:1  warning  $(pwd -P)  cwd""#,
    );
    let config = CheckerConfig::new(analyzer).with_project_root(Some(root.clone()));
    let mut controller = CheckController::new(config);
    let (delivered, report) = recorder();

    controller
        .check_document(document(1, &src, "a.js", "x"), report)
        .unwrap();
    settle(&mut controller).await;

    let expected = root.canonicalize().unwrap();
    assert_eq!(
        deliveries(&delivered)[0][0].message(),
        format!("warning: {} [cwd]", expected.display())
    );
}

#[tokio::test]
async fn runs_in_discovered_project_root() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("project");
    let src = root.join("src").join("deep");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(root.join("package.json"), "{}").unwrap();
    let analyzer = fake_analyzer(
        tmp.path(),
        r#"cat >/dev/null
echo "1:1  warning  $(pwd -P)  cwd""#,
    );
    let config =
        CheckerConfig::new(analyzer).with_root_markers(vec!["package.json".to_string()]);
    let mut controller = CheckController::new(config);
    let (delivered, report) = recorder();

    controller
        .check_document(document(1, &src, "a.js", "x"), report)
        .unwrap();
    settle(&mut controller).await;

    let expected = root.canonicalize().unwrap();
    assert_eq!(
        deliveries(&delivered)[0][0].message(),
        format!("warning: {} [cwd]", expected.display())
    );
}

#[tokio::test]
async fn tool_failure_report_spans_document() {
    let tmp = tempfile::tempdir().unwrap();
    let analyzer = fake_analyzer(
        tmp.path(),
        r#"cat >/dev/null
echo "Error: No ESLint configuration found."
exit 2"#,
    );
    let mut controller = controller(analyzer);
    let (delivered, report) = recorder();

    let text = "const a = 1;\nconst b = 2;\n";
    controller
        .check_document(document(1, tmp.path(), "a.js", text), report)
        .unwrap();
    settle(&mut controller).await;

    let delivered = deliveries(&delivered);
    assert_eq!(delivered[0].len(), 1);
    let diagnostic = &delivered[0][0];
    assert_eq!(diagnostic.range(), 0..text.len());
    assert_eq!(diagnostic.severity(), Severity::Error);
    assert_eq!(diagnostic.message(), "Error: No ESLint configuration found.");
}

#[tokio::test]
async fn nonzero_exit_without_report_delivers_nothing_found() {
    let tmp = tempfile::tempdir().unwrap();
    let analyzer = fake_analyzer(
        tmp.path(),
        r#"cat >/dev/null
echo "Oops! Something went wrong" >&2
exit 2"#,
    );
    let mut controller = controller(analyzer);
    let (delivered, report) = recorder();

    controller
        .check_document(document(1, tmp.path(), "a.js", "x"), report)
        .unwrap();
    let outcome = tokio::time::timeout(WAIT, controller.next_completion())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.state, RunState::Completed);
    assert_eq!(deliveries(&delivered), vec![Vec::new()]);
}

#[tokio::test]
async fn analyzer_that_ignores_stdin_still_reports() {
    let tmp = tempfile::tempdir().unwrap();
    // Exits without reading; the write side sees a broken pipe.
    let analyzer = fake_analyzer(tmp.path(), r#"echo "1:1  error  early exit  early""#);
    let mut controller = controller(analyzer);
    let (delivered, report) = recorder();

    let text = "y".repeat(256 * 1024);
    controller
        .check_document(document(1, tmp.path(), "a.js", &text), report)
        .unwrap();
    settle(&mut controller).await;

    let delivered = deliveries(&delivered);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0][0].message(), "error: early exit [early]");
}
