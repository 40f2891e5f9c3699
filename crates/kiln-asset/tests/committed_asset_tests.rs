//! Materialization behaviour of `CommittedAsset` against counting doubles.

mod common;

use bytes::Bytes;
use common::{FakeCompiler, FakeOutput, Harness, StaticConfig, sample_map};
use futures::StreamExt;
use kiln_core::content::drain;
use kiln_core::{AssetDescriptor, Dependency, Error, IncludedFile};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;

fn bytes_compiler(text: &'static str) -> FakeCompiler {
    FakeCompiler::new(FakeOutput::Bytes(text))
}

fn stored(id: &str, content_key: &str) -> AssetDescriptor {
    AssetDescriptor::builder(id, "/project/src/index.js")
        .content_key(content_key)
        .build()
}

fn ast_only(id: &str, ast_key: &str) -> AssetDescriptor {
    AssetDescriptor::builder(id, "/project/src/index.ts")
        .ast_key(ast_key)
        .build()
}

#[tokio::test]
async fn test_stored_content_without_map() {
    let h = Harness::new(bytes_compiler("unused"));
    h.store.seed("k1", "export default 1;");
    let asset = h.asset(stored("a1", "k1"));

    assert_eq!(asset.get_code().await.unwrap(), "export default 1;");
    assert!(asset.get_map().await.unwrap().is_none());
    assert!(asset.get_map_buffer().await.unwrap().is_none());
    assert_eq!(h.compiler.calls(), 0);
}

#[tokio::test]
async fn test_buffer_matches_stored_bytes() {
    let h = Harness::new(bytes_compiler("unused"));
    let blob: Vec<u8> = (0u8..=255).collect();
    h.store.seed("k1", blob.clone());
    let asset = h.asset(stored("a1", "k1"));

    let buffer = asset.get_buffer().await.unwrap();
    assert_eq!(buffer.as_ref(), blob.as_slice());
}

#[tokio::test]
async fn test_buffer_is_read_once() {
    let h = Harness::new(bytes_compiler("unused"));
    h.store.seed("k1", "console.log('hi');");
    let asset = h.asset(stored("a1", "k1"));

    let (a, b, c) = tokio::join!(asset.get_buffer(), asset.get_code(), asset.get_buffer());
    assert_eq!(a.unwrap(), Bytes::from_static(b"console.log('hi');"));
    assert_eq!(b.unwrap(), "console.log('hi');");
    assert_eq!(c.unwrap().len(), 18);

    asset.get_code().await.unwrap();
    assert_eq!(h.store.stream_opens(), 1);
}

#[tokio::test]
async fn test_empty_content_is_zero_length_buffer() {
    let h = Harness::new(bytes_compiler("unused"));
    h.store.seed("empty", Bytes::new());
    let asset = h.asset(stored("a1", "empty"));

    assert!(asset.get_buffer().await.unwrap().is_empty());
    assert_eq!(asset.get_code().await.unwrap(), "");
}

#[tokio::test]
async fn test_content_regenerated_from_ast() {
    let h = Harness::new(bytes_compiler("x"));
    h.seed_ast("ast1");
    let asset = h.asset(ast_only("a2", "ast1"));

    assert_eq!(asset.get_buffer().await.unwrap(), Bytes::from_static(b"x"));
    assert_eq!(asset.get_code().await.unwrap(), "x");
    assert_eq!(h.compiler.calls(), 1);
    assert_eq!(*h.compiler.seen_kinds.lock().unwrap(), vec!["js".to_string()]);
}

#[tokio::test]
async fn test_concurrent_accessors_share_one_generation() {
    let h = Harness::new(bytes_compiler("x"));
    h.seed_ast("ast1");
    let asset = h.asset(ast_only("a2", "ast1"));

    let (content, code, buffer) =
        tokio::join!(asset.get_content(), asset.get_code(), asset.get_buffer());
    assert_eq!(content.unwrap().into_bytes().await.unwrap(), Bytes::from_static(b"x"));
    assert_eq!(code.unwrap(), "x");
    assert_eq!(buffer.unwrap(), Bytes::from_static(b"x"));

    assert_eq!(h.compiler.calls(), 1);
    assert_eq!(h.store.blob_reads(), 1);
}

#[tokio::test]
async fn test_generated_stream_is_buffered_once() {
    let h = Harness::new(FakeCompiler::new(FakeOutput::Chunks(vec!["ab", "c"])));
    h.seed_ast("ast1");
    let asset = h.asset(ast_only("a3", "ast1"));

    assert_eq!(asset.get_code().await.unwrap(), "abc");
    assert_eq!(asset.get_code().await.unwrap(), "abc");
    assert_eq!(h.compiler.calls(), 1);
}

#[tokio::test]
async fn test_consumed_generated_stream_is_regenerated() {
    let h = Harness::new(FakeCompiler::new(FakeOutput::Chunks(vec!["ab", "c"])));
    h.seed_ast("ast1");
    let asset = h.asset(ast_only("a3", "ast1"));

    let first = asset.get_content().await.unwrap();
    assert!(first.is_stream());
    let second = asset.get_content().await.unwrap();

    assert_eq!(second.into_bytes().await.unwrap(), Bytes::from_static(b"abc"));
    assert_eq!(first.into_bytes().await.unwrap(), Bytes::from_static(b"abc"));
    assert_eq!(h.compiler.calls(), 2);
}

#[tokio::test]
async fn test_missing_content() {
    let h = Harness::new(bytes_compiler("unused"));
    let asset = h.asset(AssetDescriptor::builder("a4", "/project/a.css").build());

    let err = asset.get_code().await.unwrap_err();
    assert!(matches!(err, Error::MissingContent(id) if id == "a4"));
    assert!(matches!(asset.get_content().await, Err(Error::MissingContent(_))));
}

#[tokio::test]
async fn test_content_flag_without_key() {
    let h = Harness::new(bytes_compiler("unused"));
    let asset = h.asset(
        AssetDescriptor::builder("a5", "/project/a.js")
            .has_content(true)
            .build(),
    );

    let err = asset.get_buffer().await.unwrap_err();
    assert!(matches!(err, Error::MissingKey { slot: "content", .. }));
}

#[tokio::test]
async fn test_missing_content_blob_is_not_found() {
    let h = Harness::new(bytes_compiler("unused"));
    let asset = h.asset(stored("a6", "gone"));

    let err = asset.get_buffer().await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_ast_is_fetched_once() {
    let h = Harness::new(bytes_compiler("unused"));
    h.seed_ast("ast1");
    let asset = h.asset(ast_only("a7", "ast1"));

    let (first, second) = tokio::join!(asset.get_ast(), asset.get_ast());
    let (first, second) = (first.unwrap(), second.unwrap());
    assert!(Arc::ptr_eq(&first, &second));

    let third = asset.get_ast().await.unwrap();
    assert!(Arc::ptr_eq(&first, &third));
    assert_eq!(h.store.blob_reads(), 1);
}

#[tokio::test]
async fn test_asset_without_ast() {
    let h = Harness::new(bytes_compiler("unused"));
    h.store.seed("k1", "body {}");
    let asset = h.asset(stored("a8", "k1"));

    assert!(matches!(asset.get_ast().await, Err(Error::NoAst(id)) if id == "a8"));
    assert_eq!(h.store.blob_reads(), 0);
}

#[tokio::test]
async fn test_corrupt_ast_is_retried() {
    let h = Harness::new(bytes_compiler("unused"));
    h.store.seed("ast1", "not an ast");
    let asset = h.asset(ast_only("a9", "ast1"));

    let err = asset.get_ast().await.unwrap_err();
    assert!(matches!(err, Error::CorruptAst { ref key, .. } if key == "ast1"));

    h.seed_ast("ast1");
    let ast = asset.get_ast().await.unwrap();
    assert_eq!(ast.kind, "js");
    assert_eq!(h.store.blob_reads(), 2);
}

#[tokio::test]
async fn test_map_read_from_store() {
    let h = Harness::new(bytes_compiler("unused"));
    let map = sample_map();
    h.store.seed("k1", "let a;");
    h.store.seed("m1", map.to_buffer().unwrap());
    let asset = h.asset(
        AssetDescriptor::builder("a10", "/project/a.js")
            .content_key("k1")
            .map_key("m1")
            .build(),
    );

    let decoded = asset.get_map().await.unwrap().unwrap();
    assert_eq!(decoded.sources(), map.sources());
    assert_eq!(decoded.mappings(), map.mappings());

    let again = asset.get_map().await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&decoded, &again));
    assert_eq!(h.store.blob_reads(), 1);
}

#[tokio::test]
async fn test_missing_map_regenerated_from_ast() {
    let map = sample_map();
    let h = Harness::new(bytes_compiler("x").with_map(map.clone()));
    h.seed_ast("ast1");
    let asset = h.asset(
        AssetDescriptor::builder("a11", "/project/a.ts")
            .ast_key("ast1")
            .map_key("m-missing")
            .build(),
    );

    let buffer = asset.get_map_buffer().await.unwrap().unwrap();
    assert_eq!(buffer, map.to_buffer().unwrap());

    let decoded = asset.get_map().await.unwrap().unwrap();
    assert_eq!(decoded.mappings(), map.mappings());
    assert_eq!(h.compiler.calls(), 1);
}

#[tokio::test]
async fn test_map_and_content_fallbacks_share_generation() {
    let h = Harness::new(bytes_compiler("x").with_map(sample_map()));
    h.seed_ast("ast1");
    let asset = h.asset(
        AssetDescriptor::builder("a12", "/project/a.ts")
            .ast_key("ast1")
            .map_key("m-missing")
            .build(),
    );

    let (map, code) = tokio::join!(asset.get_map_buffer(), asset.get_code());
    assert!(map.unwrap().is_some());
    assert_eq!(code.unwrap(), "x");
    assert_eq!(h.compiler.calls(), 1);
}

#[tokio::test]
async fn test_missing_map_without_ast_fails_and_stays_failed() {
    let h = Harness::new(bytes_compiler("unused"));
    h.store.seed("k1", "let a;");
    let asset = h.asset(
        AssetDescriptor::builder("a13", "/project/a.js")
            .content_key("k1")
            .map_key("m-missing")
            .build(),
    );

    assert!(asset.get_map_buffer().await.unwrap_err().is_not_found());

    h.store.seed("m-missing", sample_map().to_buffer().unwrap());
    assert!(asset.get_map_buffer().await.unwrap_err().is_not_found());
    assert!(asset.get_map().await.unwrap_err().is_not_found());
    assert_eq!(h.store.blob_reads(), 1);
    assert_eq!(h.compiler.calls(), 0);
}

#[tokio::test]
async fn test_map_store_failure_is_not_regenerated() {
    let h = Harness::new(bytes_compiler("x").with_map(sample_map()));
    h.seed_ast("ast1");
    h.store.fail_next("m1", Error::Store("disk offline".into()));
    let asset = h.asset(
        AssetDescriptor::builder("a14", "/project/a.ts")
            .ast_key("ast1")
            .map_key("m1")
            .build(),
    );

    let err = asset.get_map_buffer().await.unwrap_err();
    assert!(matches!(err, Error::Store(msg) if msg == "disk offline"));
    assert_eq!(h.compiler.calls(), 0);
}

#[tokio::test]
async fn test_stream_returned_before_fetch() {
    let h = Harness::new(bytes_compiler("unused"));
    h.store.seed("k1", "abcdefghij");
    let asset = h.asset(stored("a15", "k1"));

    let stream = asset.get_stream();
    assert_eq!(h.store.stream_opens(), 0);

    let chunks: Vec<Bytes> = stream.map(|chunk| chunk.unwrap()).collect().await;
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks.concat(), b"abcdefghij");
    assert_eq!(h.store.stream_opens(), 1);
}

#[tokio::test]
async fn test_stream_after_buffer_reuses_memo() {
    let h = Harness::new(bytes_compiler("unused"));
    h.store.seed("k1", "abcdefghij");
    let asset = h.asset(stored("a16", "k1"));

    asset.get_buffer().await.unwrap();
    let content = drain(asset.get_stream()).await.unwrap();
    assert_eq!(content, Bytes::from_static(b"abcdefghij"));
    assert_eq!(h.store.stream_opens(), 1);
}

#[tokio::test]
async fn test_stream_joins_pending_buffer() {
    let h = Harness::new(bytes_compiler("unused"));
    h.store.seed("k1", "abcdefghij");
    let asset = h.asset(stored("a16", "k1"));

    let mut buffer = Box::pin(asset.get_buffer());
    assert!(futures::poll!(&mut buffer).is_pending());
    assert_eq!(h.store.stream_opens(), 1);

    let content = drain(asset.get_stream()).await.unwrap();
    assert_eq!(content, Bytes::from_static(b"abcdefghij"));
    assert_eq!(buffer.await.unwrap(), content);
    assert_eq!(h.store.stream_opens(), 1);
}

#[tokio::test]
async fn test_abandoned_calls_release_the_asset() {
    let h = Harness::new(bytes_compiler("export default 1;"));
    h.store.seed("k1", "abcdefghij");
    h.seed_ast("ast1");
    let before = Arc::strong_count(&h.store);

    let asset = h.asset(stored("a16", "k1"));
    assert!(futures::FutureExt::now_or_never(asset.get_buffer()).is_none());
    drop(asset);
    assert_eq!(Arc::strong_count(&h.store), before);

    let asset = h.asset(ast_only("a16", "ast1"));
    assert!(futures::FutureExt::now_or_never(asset.get_buffer()).is_none());
    drop(asset);
    assert_eq!(Arc::strong_count(&h.store), before);
    assert_eq!(Arc::strong_count(&h.compiler), 1);
}

#[tokio::test]
async fn test_projections() {
    let h = Harness::new(bytes_compiler("unused"));
    let asset = h.asset(
        AssetDescriptor::builder("a17", "/project/src/app.js")
            .include_file(IncludedFile::new("/project/src/partial.html"))
            .dependency(Dependency::new("./util"))
            .dependency(Dependency::new("react"))
            .build(),
    );

    assert_eq!(
        asset.get_included_files(),
        vec![IncludedFile::new("/project/src/partial.html")]
    );
    let specifiers: Vec<String> = asset
        .get_dependencies()
        .into_iter()
        .map(|dep| dep.specifier)
        .collect();
    assert_eq!(specifiers, vec!["./util", "react"]);
}

#[tokio::test]
async fn test_config_and_package_lookup() {
    let config = StaticConfig::default()
        .with(".babelrc", serde_json::json!({"presets": ["env"]}))
        .with("package.json", serde_json::json!({"name": "app", "version": "1.2.0"}));
    let h = Harness::new(bytes_compiler("unused")).with_config(config);
    let asset = h.asset(AssetDescriptor::builder("a18", "/project/src/app.js").build());

    let babel = asset
        .get_config(&[PathBuf::from(".babelrc")], None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(babel["presets"][0], "env");

    assert!(
        asset
            .get_config(&[PathBuf::from("tsconfig.json")], None)
            .await
            .unwrap()
            .is_none()
    );

    let pkg = asset.get_package().await.unwrap().unwrap();
    assert_eq!(pkg.name, "app");
    assert_eq!(pkg.version.as_deref(), Some("1.2.0"));
}
