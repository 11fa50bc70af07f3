use std::time::Duration;

use mockito::Matcher;
use pmsettle_sdk::{
    config::PipelineConfig,
    pipeline::{
        progress::{EventKind, ProgressEvent, StepId},
        submit::Wallet,
        PipelineState, SettlementPipeline,
    },
    pyth::Hermes,
    utils::encode_base64,
    Error,
};
use solana_sdk::{pubkey::Pubkey, transaction::TransactionError};

use crate::setup::{
    config, drain, init_tracing, is_signer, progress, signature_of, Failure, MockLedger,
    MockOracle, Template, TestWallet, WalletMode, WatchOnlyWallet, END_TS, FEED,
};

fn steps(events: &[ProgressEvent]) -> Vec<(StepId, &'static str)> {
    events
        .iter()
        .map(|event| {
            let kind = match event.kind {
                EventKind::Start => "start",
                EventKind::Success { .. } => "success",
                EventKind::Warning { .. } => "warning",
                EventKind::Error { .. } => "error",
            };
            (event.step, kind)
        })
        .collect()
}

#[tokio::test]
async fn small_vaa_is_posted_then_resolved() -> eyre::Result<()> {
    let _guard = init_tracing();
    let ledger = MockLedger::default();
    let wallet = TestWallet::new(WalletMode::Sign);
    let oracle = MockOracle::new(100);
    let template = Template::new();
    let (tx, mut rx) = progress();

    let mut pipeline =
        SettlementPipeline::new(config(), &ledger, &wallet, &oracle).with_reporter(tx);
    let result = pipeline.run(&template.bundle(&wallet.pubkey())).await?;

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(oracle.fetched()[0].1, END_TS);
    assert_eq!(oracle.fetched()[0].0.to_bytes(), FEED);
    assert_eq!(
        steps(&drain(&mut rx)),
        [
            (StepId::PostWrite, "start"),
            (StepId::PostWrite, "success"),
            (StepId::Resolve, "start"),
            (StepId::Resolve, "success"),
        ]
    );
    assert_eq!(
        result.signatures,
        [
            (StepId::PostWrite, signature_of(&ledger, 0)),
            (StepId::Resolve, signature_of(&ledger, 1)),
        ]
    );
    assert_eq!(result.warnings, 0);
    assert_eq!(ledger.simulations(), 1);

    let submitted = ledger.submitted();
    let post = &submitted[0];
    assert_eq!(post.message.header().num_required_signatures, 3);

    // The consume transaction references the posted price update and nothing else signs.
    let resolve = &submitted[1];
    assert_eq!(resolve.message.header().num_required_signatures, 1);
    let posted = post.message.static_account_keys()[1..3].to_vec();
    let resolve_keys = resolve.message.static_account_keys();
    assert_eq!(
        posted.iter().filter(|key| resolve_keys.contains(key)).count(),
        1
    );
    assert!(!resolve_keys.contains(&template.placeholder));
    assert!(!is_signer(resolve, &template.market));
    Ok(())
}

#[tokio::test]
async fn large_vaa_is_posted_in_two_transactions() -> eyre::Result<()> {
    let _guard = init_tracing();
    let ledger = MockLedger::default();
    let wallet = TestWallet::new(WalletMode::Sign);
    let oracle = MockOracle::new(1000);
    let template = Template::new();
    let (tx, mut rx) = progress();

    let mut pipeline =
        SettlementPipeline::new(config(), &ledger, &wallet, &oracle).with_reporter(tx);
    let result = pipeline.run(&template.bundle(&wallet.pubkey())).await?;

    let order = result
        .signatures
        .iter()
        .map(|(step, _)| *step)
        .collect::<Vec<_>>();
    assert_eq!(order, [StepId::PostInit, StepId::PostWrite, StepId::Resolve]);
    assert_eq!(drain(&mut rx).len(), 6);

    let submitted = ledger.submitted();
    assert_eq!(submitted.len(), 3);
    // The init phase is signed by the encoded VAA, the write phase by the price update.
    let encoded_vaa = submitted[0].message.static_account_keys()[1];
    let price_update = submitted[1].message.static_account_keys()[1];
    assert_ne!(encoded_vaa, price_update);
    assert!(is_signer(&submitted[0], &encoded_vaa));
    assert!(!is_signer(&submitted[1], &encoded_vaa));
    assert!(submitted[1].message.static_account_keys().contains(&encoded_vaa));
    assert!(submitted[2].message.static_account_keys().contains(&price_update));
    Ok(())
}

#[tokio::test]
async fn already_processed_is_a_warning() -> eyre::Result<()> {
    let _guard = init_tracing();
    let ledger = MockLedger::default()
        .fail_submission(0, Failure::Failed(TransactionError::AlreadyProcessed));
    let wallet = TestWallet::new(WalletMode::Sign);
    let oracle = MockOracle::new(100);
    let template = Template::new();
    let (tx, mut rx) = progress();

    let mut pipeline =
        SettlementPipeline::new(config(), &ledger, &wallet, &oracle).with_reporter(tx);
    let result = pipeline.run(&template.bundle(&wallet.pubkey())).await?;

    assert_eq!(
        steps(&drain(&mut rx)),
        [
            (StepId::PostWrite, "start"),
            (StepId::PostWrite, "warning"),
            (StepId::Resolve, "start"),
            (StepId::Resolve, "success"),
        ]
    );
    assert_eq!(result.warnings, 1);
    assert_eq!(
        result.signatures,
        [(StepId::Resolve, signature_of(&ledger, 1))]
    );
    assert_eq!(pipeline.state(), PipelineState::Done);
    Ok(())
}

#[tokio::test]
async fn unconfirmed_already_processed_message_is_a_warning() -> eyre::Result<()> {
    let ledger = MockLedger::default().fail_submission(
        1,
        Failure::Unconfirmed("This transaction has already been processed"),
    );
    let wallet = TestWallet::new(WalletMode::Sign);
    let oracle = MockOracle::new(100);
    let template = Template::new();
    let (tx, mut rx) = progress();

    let mut pipeline =
        SettlementPipeline::new(config(), &ledger, &wallet, &oracle).with_reporter(tx);
    let result = pipeline.run(&template.bundle(&wallet.pubkey())).await?;

    assert_eq!(
        steps(&drain(&mut rx)),
        [
            (StepId::PostWrite, "start"),
            (StepId::PostWrite, "success"),
            (StepId::Resolve, "start"),
            (StepId::Resolve, "warning"),
        ]
    );
    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(result.warnings, 1);
    assert_eq!(
        result.signatures,
        [(StepId::PostWrite, signature_of(&ledger, 0))]
    );
    Ok(())
}

#[tokio::test]
async fn fatal_failure_aborts_with_last_signature() -> eyre::Result<()> {
    let _guard = init_tracing();
    let ledger = MockLedger::default()
        .fail_submission(1, Failure::Failed(TransactionError::AccountNotFound));
    let wallet = TestWallet::new(WalletMode::Sign);
    let oracle = MockOracle::new(1000);
    let template = Template::new();
    let (tx, mut rx) = progress();

    let mut pipeline =
        SettlementPipeline::new(config(), &ledger, &wallet, &oracle).with_reporter(tx);
    let failure = pipeline
        .run(&template.bundle(&wallet.pubkey()))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, Error::Submission(_)));
    assert_eq!(failure.state, PipelineState::Posting(1));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    let first = signature_of(&ledger, 0);
    assert_eq!(failure.last_signature(), Some(&first));
    assert_eq!(ledger.submitted().len(), 2);

    let events = drain(&mut rx);
    assert_eq!(
        steps(&events),
        [
            (StepId::PostInit, "start"),
            (StepId::PostInit, "success"),
            (StepId::PostWrite, "start"),
            (StepId::PostWrite, "error"),
        ]
    );
    let EventKind::Error { last_signature, .. } = &events[3].kind else {
        panic!("expected an error event");
    };
    assert_eq!(last_signature.as_ref(), Some(&first));
    Ok(())
}

#[tokio::test]
async fn incomplete_signature_is_never_submitted() -> eyre::Result<()> {
    let ledger = MockLedger::default();
    let wallet = TestWallet::new(WalletMode::LeaveEmpty);
    let oracle = MockOracle::new(100);
    let template = Template::new();
    let (tx, mut rx) = progress();

    let mut pipeline =
        SettlementPipeline::new(config(), &ledger, &wallet, &oracle).with_reporter(tx);
    let failure = pipeline
        .run(&template.bundle(&wallet.pubkey()))
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        Error::IncompleteSignature { index: 0, signer } if signer == wallet.pubkey()
    ));
    assert!(ledger.submitted().is_empty());
    assert_eq!(
        steps(&drain(&mut rx)),
        [(StepId::PostWrite, "start"), (StepId::PostWrite, "error")]
    );
    Ok(())
}

#[tokio::test]
async fn watch_only_wallet_is_unsupported() -> eyre::Result<()> {
    let ledger = MockLedger::default();
    let wallet = WatchOnlyWallet(Pubkey::new_unique());
    let oracle = MockOracle::new(100);
    let template = Template::new();

    let mut pipeline = SettlementPipeline::new(config(), &ledger, &wallet, &oracle);
    let failure = pipeline.run(&template.bundle(&wallet.0)).await.unwrap_err();
    assert!(matches!(failure.error, Error::WalletUnsupported));
    assert!(ledger.submitted().is_empty());
    Ok(())
}

#[tokio::test]
async fn wallet_signature_times_out() -> eyre::Result<()> {
    let ledger = MockLedger::default();
    let wallet = TestWallet::new(WalletMode::Hang);
    let oracle = MockOracle::new(100);
    let template = Template::new();
    let config = PipelineConfig {
        signature_timeout: Duration::from_millis(20),
        ..config()
    };

    let mut pipeline = SettlementPipeline::new(config, &ledger, &wallet, &oracle);
    let failure = pipeline
        .run(&template.bundle(&wallet.pubkey()))
        .await
        .unwrap_err();
    assert!(matches!(failure.error, Error::TimedOut(_)));
    assert_eq!(failure.state, PipelineState::Posting(0));
    assert!(ledger.submitted().is_empty());
    Ok(())
}

#[tokio::test]
async fn a_pipeline_runs_once() -> eyre::Result<()> {
    let ledger = MockLedger::default();
    let wallet = TestWallet::new(WalletMode::Sign);
    let oracle = MockOracle::new(100);
    let template = Template::new();
    let bundle = template.bundle(&wallet.pubkey());
    let (tx, mut rx) = progress();

    let mut pipeline =
        SettlementPipeline::new(config(), &ledger, &wallet, &oracle).with_reporter(tx);
    pipeline.run(&bundle).await?;
    drain(&mut rx);

    let failure = pipeline.run(&bundle).await.unwrap_err();
    assert!(matches!(failure.error, Error::InvalidState(_)));
    assert_eq!(failure.state, PipelineState::Done);
    assert_eq!(pipeline.state(), PipelineState::Done);
    assert!(drain(&mut rx).is_empty());
    assert_eq!(ledger.submitted().len(), 2);
    Ok(())
}

#[tokio::test]
async fn malformed_template_fails_before_posting() -> eyre::Result<()> {
    let ledger = MockLedger::default();
    let wallet = TestWallet::new(WalletMode::Sign);
    let oracle = MockOracle::new(100);
    let template = Template::new();
    let mut bundle = template.bundle(&wallet.pubkey());
    bundle.instructions[0].payload = "not base64!".to_string();
    let (tx, mut rx) = progress();

    let mut pipeline =
        SettlementPipeline::new(config(), &ledger, &wallet, &oracle).with_reporter(tx);
    let failure = pipeline.run(&bundle).await.unwrap_err();

    assert!(matches!(failure.error, Error::Decode(_)));
    assert_eq!(failure.state, PipelineState::Fetching);
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(failure.signatures.is_empty());
    assert_eq!(steps(&drain(&mut rx)), [(StepId::Resolve, "error")]);
    assert_eq!(oracle.fetched().len(), 1);
    assert!(ledger.submitted().is_empty());
    Ok(())
}

#[tokio::test]
async fn accounts_are_closed_after_resolution() -> eyre::Result<()> {
    let ledger = MockLedger::default();
    let wallet = TestWallet::new(WalletMode::Sign);
    let oracle = MockOracle::new(100);
    let template = Template::new();
    let config = PipelineConfig {
        close_accounts: true,
        ..config()
    };
    let (tx, mut rx) = progress();

    let mut pipeline =
        SettlementPipeline::new(config, &ledger, &wallet, &oracle).with_reporter(tx);
    let result = pipeline.run(&template.bundle(&wallet.pubkey())).await?;

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(
        steps(&drain(&mut rx)),
        [
            (StepId::PostWrite, "start"),
            (StepId::PostWrite, "success"),
            (StepId::Resolve, "start"),
            (StepId::Resolve, "success"),
            (StepId::PostClose, "start"),
            (StepId::PostClose, "success"),
        ]
    );
    assert_eq!(
        result.signatures,
        [
            (StepId::PostWrite, signature_of(&ledger, 0)),
            (StepId::Resolve, signature_of(&ledger, 1)),
            (StepId::PostClose, signature_of(&ledger, 2)),
        ]
    );

    let submitted = ledger.submitted();
    assert_eq!(submitted.len(), 3);
    let posted = submitted[0].message.static_account_keys()[1..3].to_vec();
    let close = &submitted[2];
    assert_eq!(close.message.header().num_required_signatures, 1);
    assert!(posted
        .iter()
        .all(|key| close.message.static_account_keys().contains(key)));
    Ok(())
}

#[tokio::test]
async fn failing_to_close_accounts_only_warns() -> eyre::Result<()> {
    let ledger = MockLedger::default()
        .fail_submission(2, Failure::Failed(TransactionError::AccountNotFound));
    let wallet = TestWallet::new(WalletMode::Sign);
    let oracle = MockOracle::new(100);
    let template = Template::new();
    let config = PipelineConfig {
        close_accounts: true,
        ..config()
    };
    let (tx, mut rx) = progress();

    let mut pipeline =
        SettlementPipeline::new(config, &ledger, &wallet, &oracle).with_reporter(tx);
    let result = pipeline.run(&template.bundle(&wallet.pubkey())).await?;

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(
        steps(&drain(&mut rx))[4..],
        [(StepId::PostClose, "start"), (StepId::PostClose, "warning")]
    );
    assert_eq!(result.warnings, 1);
    assert_eq!(result.signatures.len(), 2);
    assert_eq!(ledger.submitted().len(), 3);
    Ok(())
}

#[tokio::test]
async fn rejected_bundle_fails_fetch() -> eyre::Result<()> {
    let ledger = MockLedger::default();
    let wallet = TestWallet::new(WalletMode::Sign);
    let oracle = MockOracle::new(100);
    let mut bundle = Template::new().bundle(&wallet.pubkey());
    bundle.ok = false;
    bundle.error = Some("market is not closed yet".to_string());
    let (tx, mut rx) = progress();

    let mut pipeline =
        SettlementPipeline::new(config(), &ledger, &wallet, &oracle).with_reporter(tx);
    let failure = pipeline.run(&bundle).await.unwrap_err();

    assert!(
        matches!(&failure.error, Error::InvalidArgument(msg) if msg == "market is not closed yet")
    );
    assert_eq!(failure.state, PipelineState::Fetching);
    assert!(oracle.fetched().is_empty());
    assert_eq!(
        steps(&drain(&mut rx)),
        [(StepId::Fetch, "error")]
    );
    Ok(())
}

#[tokio::test]
async fn empty_attestation_fails_fetch_without_ledger_calls() -> eyre::Result<()> {
    let _guard = init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", format!("/v2/updates/price/{END_TS}").as_str())
        .match_query(Matcher::UrlEncoded("ids[]".into(), hex::encode(FEED)))
        .with_status(200)
        .with_body(
            serde_json::json!({
                "binary": {"encoding": "base64", "data": Vec::<String>::new()},
                "parsed": []
            })
            .to_string(),
        )
        .create_async()
        .await;

    let ledger = MockLedger::default();
    let wallet = TestWallet::new(WalletMode::Sign);
    let hermes = Hermes::try_new(server.url())?;
    let (tx, mut rx) = progress();

    let mut pipeline =
        SettlementPipeline::new(config(), &ledger, &wallet, &hermes).with_reporter(tx);
    let failure = pipeline
        .run(&Template::new().bundle(&wallet.pubkey()))
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(failure.error, Error::NoAttestationData(_)));
    assert_eq!(ledger.calls(), 0);
    let events = drain(&mut rx);
    assert_eq!(steps(&events), [(StepId::Fetch, "error")]);
    assert!(matches!(
        events[0].kind,
        EventKind::Error {
            last_signature: None,
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn foreign_attestation_fails_fetch() -> eyre::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", Matcher::Any)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            serde_json::json!({
                "binary": {"encoding": "base64", "data": [encode_base64(b"PNAX")]},
                "parsed": []
            })
            .to_string(),
        )
        .create_async()
        .await;

    let ledger = MockLedger::default();
    let wallet = TestWallet::new(WalletMode::Sign);
    let hermes = Hermes::try_new(server.url())?;

    let mut pipeline = SettlementPipeline::new(config(), &ledger, &wallet, &hermes);
    let failure = pipeline
        .run(&Template::new().bundle(&wallet.pubkey()))
        .await
        .unwrap_err();
    assert!(matches!(failure.error, Error::NoAttestationData(_)));
    assert_eq!(ledger.calls(), 0);
    Ok(())
}
