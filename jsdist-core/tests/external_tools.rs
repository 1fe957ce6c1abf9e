use std::time::Duration;

use jsdist_core::compress::{self, ServiceCompressor};
use jsdist_core::contract::{Compressor, ToolError};
use mockito::Matcher;

fn service(url: String) -> ServiceCompressor {
    ServiceCompressor::new(url, "SIMPLE_OPTIMIZATIONS".into(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn service_compressor_returns_compiled_code() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/compile")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("js_code".into(), "var answer = 42;\n".into()),
            Matcher::UrlEncoded("compilation_level".into(), "SIMPLE_OPTIMIZATIONS".into()),
            Matcher::UrlEncoded("output_format".into(), "json".into()),
            Matcher::UrlEncoded("output_info".into(), "compiled_code".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"compiledCode":"var answer=42;"}"#)
        .create_async()
        .await;

    let compressed = service(format!("{}/compile", server.url()))
        .compress("var answer = 42;\n")
        .await
        .unwrap();

    assert_eq!(compressed, "var answer=42;");
    mock.assert_async().await;
}

#[tokio::test]
async fn service_compile_errors_are_rejections() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/compile")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"compiledCode":"","errors":[{"error":"Parse error. missing ; before statement","lineno":3}]}"#)
        .create_async()
        .await;

    let err = service(format!("{}/compile", server.url()))
        .compress("var = ;")
        .await
        .unwrap_err();

    match err {
        ToolError::Rejected { message, .. } => {
            assert_eq!(message, "line 3: Parse error. missing ; before statement")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn service_http_failure_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/compile")
        .with_status(503)
        .create_async()
        .await;

    let err = service(format!("{}/compile", server.url()))
        .compress("var a;")
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Http { .. }), "{err}");
}

#[tokio::test]
async fn service_empty_result_is_empty_output() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/compile")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"compiledCode":"   "}"#)
        .create_async()
        .await;

    let err = service(format!("{}/compile", server.url()))
        .compress("var a;")
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::EmptyOutput));
}

#[tokio::test]
async fn missing_compressor_config_yields_not_configured() {
    let compressor = compress::from_config(None).unwrap();
    let err = compressor.compress("var a;").await.unwrap_err();
    assert!(matches!(err, ToolError::NotConfigured("compressor")));
}

#[cfg(unix)]
mod commands {
    use std::fs;

    use jsdist_core::compress::CommandCompressor;
    use jsdist_core::config::CommandSpec;
    use jsdist_core::contract::{Compressor, DocGenerator, ToolError};
    use jsdist_core::docs::CommandDocGenerator;

    fn spec(program: &str, args: &[&str]) -> CommandSpec {
        CommandSpec {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn command_compressor_pipes_source_through_program() {
        let compressor = CommandCompressor::new(spec("tr", &["-d", " "]));
        let out = compressor.compress("var a = 1;\n").await.unwrap();
        assert_eq!(out, "vara=1;\n");
    }

    #[tokio::test]
    async fn command_compressor_failure_carries_status() {
        let compressor = CommandCompressor::new(spec("sh", &["-c", "echo broken >&2; exit 3"]));
        match compressor.compress("var a;").await.unwrap_err() {
            ToolError::Failed { stderr, status, .. } => {
                assert_eq!(stderr, "broken");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn command_compressor_reports_missing_program() {
        let compressor = CommandCompressor::new(spec("jsdist-no-such-minifier", &[]));
        let err = compressor.compress("var a;").await.unwrap_err();
        assert!(matches!(err, ToolError::Launch { .. }));
    }

    #[tokio::test]
    async fn doc_generator_runs_in_source_dir_with_output_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("docs");
        let output = dir.path().join("docs/_build/html");
        fs::create_dir_all(&output).unwrap();
        fs::write(source.join("index.rst"), "Title\n=====\n").unwrap();

        let generator = CommandDocGenerator::new(spec(
            "sh",
            &["-c", "cp index.rst \"$1/index.html\"", "sh", "{output}"],
        ));
        generator.generate(&source, &output).await.unwrap();

        assert_eq!(fs::read_to_string(output.join("index.html")).unwrap(), "Title\n=====\n");
    }
}
