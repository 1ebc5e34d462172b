//! End-to-end bootstrap tests against the in-process runtime.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use loadgate::{
    build_probe_class, BootstrapStep, ClassTransformer, ExclusionRegistry, FnTransformer,
    HarnessConfig, HarnessError, LoadGate, LoaderContext, LocalRuntime, ProbeVerifier,
    SessionBootstrap, SessionState, StaticProvider, TransformFailure, TransformerCatalog,
    TransformerChain,
};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

fn config() -> HarnessConfig {
    HarnessConfig::new()
        .with_protected_prefixes(["target/"])
        .with_remap_path("/nonexistent/loadgate/it.srg")
}

fn appender(name: &'static str, byte: u8) -> Arc<dyn ClassTransformer> {
    Arc::new(FnTransformer::new(name, move |_, _, mut bytes| {
        bytes.push(byte);
        Ok(bytes)
    }))
}

// =============================================================================
// Registry, chain and gate
// =============================================================================

#[test]
fn excluded_class_passes_through_untouched() {
    let runtime = Arc::new(LocalRuntime::new());
    let session = SessionBootstrap::builder(config().with_exclusion("lib/"))
        .host_agent(runtime)
        .build()
        .unwrap();
    session.ensure_ready().unwrap();

    let invoked = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&invoked);
    session
        .chain()
        .register_transformer(Arc::new(FnTransformer::new("Spy", move |_, _, b| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(b)
        })));

    let out = session
        .hook()
        .transform(&LoaderContext::new("app"), "lib/Util", &[7, 7, 7])
        .unwrap();
    assert!(out.is_none());
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[test]
fn units_run_in_registration_order() {
    let chain = TransformerChain::new();
    chain.register_transformer(appender("A", 0x01));
    chain.register_transformer(appender("B", 0x02));
    assert_eq!(chain.apply("pkg/X", Vec::new()).unwrap(), vec![0x01, 0x02]);
}

#[test]
fn gate_refuses_until_probe_passes() {
    let gate = LoadGate::new(["target/"]);
    assert!(matches!(
        gate.check_or_refuse("target/Entity"),
        Err(HarnessError::GateClosed { .. })
    ));

    let verifier = ProbeVerifier::default();
    verifier
        .ensure_isolated(&ExclusionRegistry::with_baseline(), &gate)
        .unwrap();
    let outcome = verifier.run(&TransformerChain::new(), &gate).unwrap();

    assert_eq!(outcome.input_len, outcome.output_len);
    assert!(gate.check_or_refuse("target/Entity").is_ok());
}

#[test]
fn concurrent_open_registers_units_once() {
    let registrations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&registrations);
    let catalog = TransformerCatalog::new().with("Counted", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FnTransformer::new("Counted", |_, _, b| Ok(b))) as Arc<dyn ClassTransformer>)
    });
    let session = Arc::new(
        SessionBootstrap::builder(config())
            .host_agent(Arc::new(LocalRuntime::new()))
            .provider(StaticProvider::new("fixes").with_transformer("Counted"))
            .catalog(catalog)
            .build()
            .unwrap(),
    );

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let session = Arc::clone(&session);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                session.ensure_ready()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(registrations.load(Ordering::SeqCst), 1);
    assert_eq!(session.state(), SessionState::Ready);
}

// =============================================================================
// Full session
// =============================================================================

#[test]
fn patched_classes_load_after_bootstrap() {
    let runtime = Arc::new(LocalRuntime::new());
    let catalog = TransformerCatalog::new().with("Tag", || Ok(appender("Tag", 0)));

    let session = SessionBootstrap::builder(config())
        .host_agent(runtime.clone())
        .provider(StaticProvider::new("fixes").with_transformer("Tag"))
        .catalog(catalog)
        .build()
        .unwrap();

    let ctx = LoaderContext::new("app");
    let entity = build_probe_class("target/Entity").unwrap();
    let err = runtime
        .define_class(&ctx, "target/Entity", &entity)
        .unwrap_err();
    assert!(matches!(err, HarnessError::GateClosed { .. }));

    session.ensure_ready().unwrap();

    // The trailing byte added by "Tag" makes the class unparseable.
    assert!(matches!(
        runtime.define_class(&ctx, "target/Entity", &entity),
        Err(HarnessError::ClassFormat { .. })
    ));
    let junit = build_probe_class("org/junit/Assert").unwrap();
    assert_eq!(
        runtime.define_class(&ctx, "org.junit.Assert", &junit).unwrap(),
        junit
    );

    let report = session.report().unwrap();
    assert!(report.succeeded());
    let probe = report.probe.unwrap();
    assert_eq!(probe.output_len, probe.input_len + 1);
    assert_eq!(probe.transformers, vec!["Tag"]);
    assert_eq!(report.hook_stats.excluded, 1);
    assert_eq!(report.hook_stats.refused, 1);
}

#[test]
fn transformer_failure_is_local_to_the_class() {
    let runtime = Arc::new(LocalRuntime::new());
    let catalog = TransformerCatalog::new().with("Picky", || {
        Ok(Arc::new(FnTransformer::new("Picky", |name, _, b| {
            if name.ends_with("/Broken") {
                Err(TransformFailure::new("unsupported layout"))
            } else {
                Ok(b)
            }
        })) as Arc<dyn ClassTransformer>)
    });
    let session = SessionBootstrap::builder(config().with_transformer("Picky"))
        .host_agent(runtime.clone())
        .catalog(catalog)
        .build()
        .unwrap();
    session.ensure_ready().unwrap();

    let ctx = LoaderContext::new("app");
    let broken = build_probe_class("target/Broken").unwrap();
    let err = runtime.define_class(&ctx, "target/Broken", &broken).unwrap_err();
    assert!(!err.is_fatal());

    let fine = build_probe_class("target/Fine").unwrap();
    assert!(runtime.define_class(&ctx, "target/Fine", &fine).is_ok());
    assert!(session.is_ready());
    assert_eq!(session.report().unwrap().hook_stats.failed, 1);
}

#[test]
fn remap_table_feeds_transformed_names() {
    // LOADGATE_SRG_MCP would override the configured path.
    if std::env::var_os(loadgate::REMAP_PATH_ENV).is_some() {
        return;
    }

    let mut srg = tempfile::NamedTempFile::new().unwrap();
    writeln!(srg, "CL: a/b target/Entity").unwrap();

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let catalog = TransformerCatalog::new().with("Names", move || {
        let record = Arc::clone(&record);
        Ok(Arc::new(FnTransformer::new("Names", move |name, transformed, b| {
            record
                .lock()
                .unwrap()
                .push((name.to_string(), transformed.to_string()));
            Ok(b)
        })) as Arc<dyn ClassTransformer>)
    });

    let runtime = Arc::new(LocalRuntime::new());
    let session = SessionBootstrap::builder(
        config()
            .with_remap_path(srg.path())
            .with_transformer("Names"),
    )
    .host_agent(runtime.clone())
    .catalog(catalog)
    .build()
    .unwrap();

    session.ensure_ready().unwrap();

    let obf = build_probe_class("a/b").unwrap();
    runtime
        .define_class(&LoaderContext::new("app"), "a/b", &obf)
        .unwrap();
    assert!(seen
        .lock()
        .unwrap()
        .contains(&("a/b".to_string(), "target/Entity".to_string())));
    assert!(session
        .report()
        .unwrap()
        .step(BootstrapStep::Remap)
        .unwrap()
        .detail
        .starts_with("1 classes"));
}

#[test]
fn missing_agent_reports_prerequisite() {
    let session = SessionBootstrap::builder(config().with_self_attach(false))
        .build()
        .unwrap();
    let err = session.ensure_ready().unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("-javaagent"));
    assert_eq!(session.state(), SessionState::Failed);
    assert!(matches!(
        session.ensure_ready(),
        Err(HarnessError::SessionAborted { .. })
    ));
}
