use std::path::PathBuf;
use std::sync::Arc;

use quay_loader::LoaderError;
use quay_render::{Body, FileDownload, Redirect, Render, RenderError, StorageArea};
use quay_test::{
    MockTemplateEngine, SarBuilder, test_config, test_config_with_drop, test_exchange,
    write_tree,
};
use tempfile::TempDir;

use super::*;
use crate::engine::SharedEngine;

struct Fixture {
    _dir: TempDir,
    apps: PathBuf,
    drop: PathBuf,
    engine: MockTemplateEngine,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let apps = dir.path().join("applications");
    let drop = dir.path().join("drop");
    std::fs::create_dir_all(&drop).unwrap();
    Fixture {
        _dir: dir,
        apps,
        drop,
        engine: MockTemplateEngine::new(),
    }
}

fn host(fx: &Fixture, config: Config) -> Host {
    Host::new(config, Arc::new(SharedEngine::new(Arc::new(fx.engine.clone()))))
}

fn shop_v1(fx: &Fixture) -> PathBuf {
    SarBuilder::new("shop")
        .file("lib/app/Home.wasm", b"home-v1")
        .file("lib/old.txt", b"old")
        .file("public/logo.png", b"png")
        .write_to(&fx.drop)
}

fn shop_v2(fx: &Fixture) -> PathBuf {
    SarBuilder::new("shop")
        .file("lib/app/Home.wasm", b"home-v2")
        .file("lib/new.txt", b"new")
        .write_to(&fx.drop)
}

#[test]
fn test_deploy_then_serve() {
    let fx = fixture();
    let host = host(&fx, test_config(&fx.apps));

    let app = host.deploy(&shop_v1(&fx)).unwrap();
    assert_eq!(app.name(), "shop");
    assert_eq!(host.module_names(), vec!["shop"]);
    assert!(fx.apps.join("shop/public/logo.png").is_file());

    let artifact = host.resolve("shop", "app::Home").unwrap();
    assert_eq!(&*artifact.bytes, b"home-v1");
    assert_eq!(artifact.defined_by, "shop");

    let mut exchange = test_exchange();
    host.dispatch("shop", &ResultValue::from(Render::new("home")), &mut exchange)
        .unwrap();
    assert_eq!(exchange.response.text(), Some("template:home"));

    let mut exchange = test_exchange();
    let download = FileDownload::new("logo.png", StorageArea::Public);
    host.dispatch("shop", &ResultValue::from(download), &mut exchange)
        .unwrap();
    assert_eq!(
        exchange.response.body,
        Body::File(fx.apps.join("shop").join("public").join("logo.png"))
    );
}

#[test]
fn test_redeploy_replaces_module_wholesale() {
    let fx = fixture();
    let host = host(&fx, test_config(&fx.apps));

    let first = host.deploy(&shop_v1(&fx)).unwrap();
    host.caches()
        .redirects
        .acquire("/cart", None, true)
        .unwrap();
    assert_eq!(host.caches().len(), 1);

    let second = host.deploy(&shop_v2(&fx)).unwrap();

    assert!(!fx.apps.join("shop/lib/old.txt").exists());
    assert!(fx.apps.join("shop/lib/new.txt").is_file());
    assert_ne!(first.module().digest, second.module().digest);
    assert!(!first.is_running());
    assert!(second.is_running());
    assert!(host.caches().is_empty());
    assert_eq!(&*host.resolve("shop", "app::Home").unwrap().bytes, b"home-v2");
}

#[test]
fn test_failed_deploy_keeps_previous_version() {
    let fx = fixture();
    let host = host(&fx, test_config(&fx.apps));
    let live = host.deploy(&shop_v1(&fx)).unwrap();

    std::fs::write(fx.drop.join("shop.sar"), b"definitely not gzip").unwrap();
    let err = host.deploy(&fx.drop.join("shop.sar")).unwrap_err();
    assert!(matches!(err, HostError::Deploy(_)));

    let current = host.application("shop").unwrap();
    assert!(Arc::ptr_eq(&live, &current));
    assert!(current.is_running());
    assert!(fx.apps.join("shop/lib/old.txt").is_file());
}

#[test]
fn test_modules_are_isolated_from_each_other() {
    let fx = fixture();
    let host = host(&fx, test_config(&fx.apps));

    let a = SarBuilder::new("a")
        .file("lib/Shared.wasm", b"from-a")
        .file("lib/OnlyA.wasm", b"only-a")
        .write_to(&fx.drop);
    let b = SarBuilder::new("b")
        .file("lib/Shared.wasm", b"from-b")
        .write_to(&fx.drop);
    host.deploy(&a).unwrap();
    host.deploy(&b).unwrap();

    assert_eq!(&*host.resolve("a", "Shared").unwrap().bytes, b"from-a");
    assert_eq!(&*host.resolve("b", "Shared").unwrap().bytes, b"from-b");

    match host.resolve("b", "OnlyA") {
        Err(HostError::Loader(LoaderError::NotFound { scope, name })) => {
            assert_eq!(scope, "b");
            assert_eq!(name, "OnlyA");
        },
        other => panic!("expected NotFound scoped to b, got {other:?}"),
    }
}

#[test]
fn test_shared_libraries_are_the_fallback() {
    let fx = fixture();
    let shared = fx.apps.parent().unwrap().join("shared");
    write_tree(
        &shared,
        &[("Common.wasm", "host-common"), ("Util.wasm", "host-util")],
    );

    let mut config = test_config(&fx.apps);
    config.server.shared_lib_dirs = vec![shared];
    let host = host(&fx, config);

    let archive = SarBuilder::new("shop")
        .file("lib/Util.wasm", b"shop-util")
        .write_to(&fx.drop);
    host.deploy(&archive).unwrap();

    let common = host.resolve("shop", "Common").unwrap();
    assert_eq!(&*common.bytes, b"host-common");
    assert_eq!(common.defined_by, HOST_SCOPE);

    let util = host.resolve("shop", "Util").unwrap();
    assert_eq!(&*util.bytes, b"shop-util");
    assert_eq!(util.defined_by, "shop");
}

#[test]
fn test_dispatch_errors_are_scoped_to_module() {
    let fx = fixture();
    let host = host(&fx, test_config(&fx.apps));
    host.deploy(&shop_v1(&fx)).unwrap();

    let mut exchange = test_exchange();
    let missing = FileDownload::new("missing.pdf", StorageArea::Private);
    match host.dispatch("shop", &ResultValue::from(missing), &mut exchange) {
        Err(HostError::Render { module, source }) => {
            assert_eq!(module, "shop");
            assert!(matches!(source, RenderError::NotFound(_)));
        },
        other => panic!("expected a render error, got {other:?}"),
    }
    assert!(exchange.response.headers.is_empty());

    assert!(matches!(
        host.dispatch("nope", &ResultValue::from(Redirect::new("/")), &mut exchange),
        Err(HostError::ModuleNotFound(name)) if name == "nope"
    ));
}

#[test]
fn test_reload_rescans_live_directory() {
    let fx = fixture();
    let host = host(&fx, test_config(&fx.apps));
    let first = host.deploy(&shop_v1(&fx)).unwrap();
    assert!(host.resolve("shop", "Extra").is_err());

    write_tree(&fx.apps.join("shop"), &[("classes/Extra.wasm", "extra")]);
    let reloaded = host.reload("shop").unwrap();

    assert!(!first.is_running());
    assert_eq!(reloaded.module(), first.module());
    assert_eq!(&*host.resolve("shop", "Extra").unwrap().bytes, b"extra");
    assert!(matches!(
        host.reload("ghost"),
        Err(HostError::ModuleNotFound(_))
    ));
}

#[test]
fn test_undeploy_removes_everything() {
    let fx = fixture();
    let host = host(&fx, test_config(&fx.apps));
    let app = host.deploy(&shop_v1(&fx)).unwrap();

    host.undeploy("shop").unwrap();
    assert!(host.is_empty());
    assert!(!app.is_running());
    assert!(!fx.apps.join("shop").exists());
    assert!(matches!(
        host.undeploy("shop"),
        Err(HostError::ModuleNotFound(_))
    ));
}

#[test]
fn test_deploy_existing_skips_bad_archives() {
    let fx = fixture();
    SarBuilder::new("blog")
        .file("public/index.html", b"blog")
        .write_to(&fx.drop);
    shop_v1(&fx);
    std::fs::write(fx.drop.join("broken.sar"), b"garbage").unwrap();

    let host = host(&fx, test_config_with_drop(&fx.apps, &fx.drop));
    let deployed = host.deploy_existing().unwrap();

    assert_eq!(deployed, vec!["blog", "shop"]);
    assert_eq!(host.module_names(), vec!["blog", "shop"]);
}

#[test]
fn test_deploy_existing_sweeps_interrupted_installs() {
    let fx = fixture();
    std::fs::create_dir_all(fx.apps.join(".quay-stage-x1/shop/lib")).unwrap();
    std::fs::create_dir_all(fx.apps.join(".quay-retired-shop-9")).unwrap();
    shop_v1(&fx);

    let host = host(&fx, test_config_with_drop(&fx.apps, &fx.drop));
    assert_eq!(host.deploy_existing().unwrap(), vec!["shop"]);

    let mut left: Vec<String> = std::fs::read_dir(&fx.apps)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, vec!["shop"]);
}

#[test]
fn test_deploy_watcher_requires_drop_dir() {
    let fx = fixture();
    let host = host(&fx, test_config(&fx.apps));
    assert!(host.deploy_watcher().unwrap().is_none());
    assert!(host.deploy_existing().unwrap().is_empty());
}

#[test]
fn test_messages_reach_the_model() {
    let fx = fixture();
    let messages =
        Arc::new(quay_render::MessageSource::new("en").with_bundle("en", [("title", "Shop")]));
    let engines = SharedEngine::new(Arc::new(fx.engine.clone())).with_messages(messages);
    let host = Host::new(test_config(&fx.apps), Arc::new(engines));
    host.deploy(&shop_v1(&fx)).unwrap();

    let mut exchange = test_exchange();
    host.dispatch("shop", &ResultValue::from(Render::new("home")), &mut exchange)
        .unwrap();
    let call = fx.engine.last_call().unwrap();
    assert_eq!(call.model["messages"]["title"], "Shop");
    assert_eq!(call.locale, "en");
}

#[tokio::test]
async fn test_hot_deploy_events() {
    let fx = fixture();
    let host = Arc::new(host(&fx, test_config_with_drop(&fx.apps, &fx.drop)));
    let archive = shop_v1(&fx);

    let (tx, rx) = mpsc::channel(8);
    let runner = tokio::spawn(Arc::clone(&host).run_hot_deploy(rx));

    tx.send(DeployEvent::ArchiveChanged {
        archive: archive.clone(),
        digest: "ignored".into(),
    })
    .await
    .unwrap();
    tx.send(DeployEvent::Error("transient".into())).await.unwrap();
    tx.send(DeployEvent::ArchiveRemoved {
        archive: fx.drop.join("never-deployed.sar"),
    })
    .await
    .unwrap();
    drop(tx);
    runner.await.unwrap();

    assert_eq!(host.module_names(), vec!["shop"]);

    let (tx, rx) = mpsc::channel(8);
    let runner = tokio::spawn(Arc::clone(&host).run_hot_deploy(rx));
    tx.send(DeployEvent::ArchiveRemoved { archive }).await.unwrap();
    drop(tx);
    runner.await.unwrap();

    assert!(host.is_empty());
    assert!(!fx.apps.join("shop").exists());
}
