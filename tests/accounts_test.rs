mod common;

use anyhow::Result;
use common::{
    INVALID_ROUTING, StandardLedger, VALID_ROUTING, single_connection_service, test_service,
};
use std::sync::Arc;
use std::time::Duration;
use transfer_ledger::AppError;
use transfer_ledger::application::ErrorKind;
use transfer_ledger::domain::NewAccount;

#[tokio::test]
async fn test_create_account_success() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = service
        .register_customer("John".into(), "Doe".into())
        .await?;

    let account = service
        .create_account(NewAccount::new(&customer.id, "John Doe", "12345678", VALID_ROUTING))
        .await?;

    assert!(!account.id.is_empty());
    assert_eq!(account.customer_id, customer.id);
    assert_eq!(account.account_holder_name, "John Doe");
    assert_eq!(account.account_number, "12345678");
    assert_eq!(account.routing_number, VALID_ROUTING);

    assert!(service.account_exists(&account.id).await?);
    assert_eq!(service.get_account(&account.id).await?, account);

    Ok(())
}

#[tokio::test]
async fn test_create_account_rejects_bad_checksum() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardLedger::create_parties(&service).await?;
    let before = service.count_accounts().await?;

    let err = service
        .create_account(NewAccount::new(
            StandardLedger::ADA,
            "John Doe",
            "12345678",
            INVALID_ROUTING,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidRoutingNumber));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(service.count_accounts().await?, before);

    Ok(())
}

#[tokio::test]
async fn test_create_account_rejects_unknown_customer() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardLedger::create_parties(&service).await?;
    let before = service.count_accounts().await?;

    let err = service
        .create_account(NewAccount::new(
            "no-such-customer",
            "John Doe",
            "12345678",
            VALID_ROUTING,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UnknownCustomer(ref id) if id == "no-such-customer"));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(service.count_accounts().await?, before);

    Ok(())
}

#[tokio::test]
async fn test_routing_checked_before_customer() -> Result<()> {
    let (service, _temp) = test_service().await?;

    // Both checks would fail; the routing number is reported first
    let err = service
        .create_account(NewAccount::new("no-such-customer", "J", "1", "02100002A"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidRoutingNumber));

    Ok(())
}

#[tokio::test]
async fn test_provision_from_json() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardLedger::create_parties(&service).await?;

    let payload = format!(
        r#"{{"customer_id":"{}","account_holder_name":"John Doe","account_number":"12345678","routing_number":"{}"}}"#,
        StandardLedger::ADA,
        VALID_ROUTING
    );
    let account = service.provision_account_json(payload.as_bytes()).await?;
    assert_eq!(account.customer_id, StandardLedger::ADA);

    let err = service
        .provision_account_json(br#"{"customer_id": "#)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn test_generated_account_ids_are_unique() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardLedger::create_parties(&service).await?;

    let mut ids = std::collections::HashSet::new();
    for n in 0..20 {
        let account = service
            .create_account(NewAccount::new(
                StandardLedger::ALAN,
                "Alan Turing",
                format!("acct-{n}"),
                VALID_ROUTING,
            ))
            .await?;
        assert!(ids.insert(account.id));
    }

    // Account numbers are not required to be unique
    service
        .create_account(NewAccount::new(StandardLedger::ALAN, "Alan Turing", "acct-0", VALID_ROUTING))
        .await?;

    let info = service.get_customer_info(StandardLedger::ALAN).await?;
    assert_eq!(info.accounts.len(), 22);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_account_creation() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardLedger::create_parties(&service).await?;
    let service = Arc::new(service);
    let before = service.count_accounts().await?;

    let mut handles = Vec::new();
    for n in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .create_account(NewAccount::new(
                    StandardLedger::ADA,
                    "Ada Lovelace",
                    format!("{n}"),
                    VALID_ROUTING,
                ))
                .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(service.count_accounts().await?, before + 8);

    Ok(())
}

#[tokio::test]
async fn test_customer_exists_probe() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardLedger::create_parties(&service).await?;

    assert!(service.customer_exists(StandardLedger::ADA).await?);
    assert!(!service.customer_exists("no-such-customer").await?);
    assert!(!service.customer_exists("").await?);

    Ok(())
}

#[tokio::test]
async fn test_import_account_checks_routing_and_customer() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardLedger::create_parties(&service).await?;

    let mut account = NewAccount::new(StandardLedger::ADA, "Ada", "1", INVALID_ROUTING)
        .into_account_with_id("acct-x");
    let err = service.import_account(&account).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidRoutingNumber));

    account.routing_number = VALID_ROUTING.into();
    account.customer_id = "nobody".into();
    let err = service.import_account(&account).await.unwrap_err();
    assert!(matches!(err, AppError::UnknownCustomer(_)));

    assert!(!service.account_exists("acct-x").await?);

    Ok(())
}

#[tokio::test]
async fn test_unknown_account_and_customer_lookups() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.get_account("missing").await.unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(_)));

    let err = service.get_customer_info("missing").await.err().unwrap();
    assert!(matches!(err, AppError::CustomerNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    Ok(())
}

#[tokio::test]
async fn test_store_timeout_is_configurable() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = service.with_store_timeout(Duration::from_secs(2));
    assert_eq!(service.store_timeout(), Duration::from_secs(2));

    // Normal calls complete well within the deadline
    assert!(service.list_transfers().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_expired_deadline_is_storage_error_and_writes_nothing() -> Result<()> {
    let (service, temp) = test_service().await?;
    StandardLedger::create(&service).await?;
    let before = service.count_accounts().await?;

    let (starved, repo) = single_connection_service(&temp, Duration::from_millis(50)).await?;
    let held = repo.writer().await?;

    let err = starved.list_transfers().await.unwrap_err();
    assert!(matches!(err, AppError::StoreTimeout { operation: "list_transfers", .. }));
    assert_eq!(err.kind(), ErrorKind::Storage);

    let err = starved
        .create_account(NewAccount::new(
            StandardLedger::ADA,
            "Ada Lovelace",
            "4242",
            VALID_ROUTING,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StoreTimeout { .. }));
    assert_eq!(err.kind(), ErrorKind::Storage);

    drop(held);
    assert_eq!(service.count_accounts().await?, before);

    Ok(())
}

#[tokio::test]
async fn test_timed_out_create_never_commits() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardLedger::create_parties(&service).await?;
    let before = service.count_accounts().await?;
    let hurried = service.clone().with_store_timeout(Duration::from_nanos(1));

    let mut created = 0;
    for n in 0..20 {
        let outcome = hurried
            .create_account(NewAccount::new(
                StandardLedger::ADA,
                "Ada Lovelace",
                format!("9{n}"),
                VALID_ROUTING,
            ))
            .await;
        match outcome {
            Ok(_) => created += 1,
            Err(e) => assert!(matches!(e, AppError::StoreTimeout { .. }), "{e:?}"),
        }
    }

    // Let any write still in flight land before counting
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(service.count_accounts().await?, before + created);

    Ok(())
}
