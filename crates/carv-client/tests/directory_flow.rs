use std::sync::Arc;
use std::time::Duration;

use carv_client::{ClientError, DirectoryConfig, DomainDirectory, MemoryRpc, NftScanner};
use carv_codec::instruction::REGISTER_DISCRIMINATOR;
use carv_codec::{
    decode_compact_u16, derive_domain_address, public_key_from_secret, DomainOperation,
    DomainRecord, TOKEN_PROGRAM_ID,
};

const PROGRAM: &str = "BXeZJSUurVptUakSQizWGfBAR7Zet3GwScSdJJvwZpXF";
const TREASURY: &str = "Dt4JtfXxotJokxWMH2p8u3FNxKEzF8DDtdFTeRGD48Xs";
const NOW: i64 = 1_700_000_000;

fn setup() -> (DomainDirectory<Arc<MemoryRpc>>, Arc<MemoryRpc>, DirectoryConfig) {
    let config = DirectoryConfig::new(PROGRAM, TREASURY)
        .unwrap()
        .with_confirmation(3, Duration::from_millis(1))
        .unwrap();
    let rpc = Arc::new(MemoryRpc::new());
    (DomainDirectory::new(config.clone(), Arc::clone(&rpc)), rpc, config)
}

fn put(rpc: &MemoryRpc, config: &DirectoryConfig, record: &DomainRecord) {
    let (address, _) = derive_domain_address(&config.program_id, &record.name).unwrap();
    rpc.set_account(address, config.program_id, record.to_account_data([0xD0; 8]));
}

#[test]
fn golden_domain_address_for_reference_program() {
    let (dir, _, _) = setup();
    let address = dir.domain_address("test").unwrap();
    assert_eq!(
        bs58::encode(address).into_string(),
        "87vNjkn7dmPPsmfnS5W8anjLzXN29s5V1dPSeyATMM1o"
    );
}

#[tokio::test]
async fn register_then_lookup() {
    let (dir, rpc, config) = setup();
    let secret = [0x21u8; 32];
    let owner = public_key_from_secret(&secret);
    rpc.set_balance(owner, 10_000_000);
    rpc.set_blockhash([0x0B; 32]);

    assert!(dir.check_availability("alice").await);

    let op = DomainOperation::Register {
        name: "alice".into(),
    };
    dir.submit(&op, &secret).await.unwrap();

    // The instruction data is the last thing in the message.
    let sent = rpc.sent_transactions();
    let wire = &sent[0];
    let (signers, _) = decode_compact_u16(wire).unwrap();
    assert_eq!(signers, 1);
    let mut expected = REGISTER_DISCRIMINATOR.to_vec();
    expected.extend_from_slice(&5u32.to_le_bytes());
    expected.extend_from_slice(b"alice");
    assert!(wire.ends_with(&expected));

    // Play the program's part.
    put(
        &rpc,
        &config,
        &DomainRecord {
            owner,
            name: "alice".into(),
            registered_at: NOW,
            expires_at: NOW + 365 * 24 * 3600,
            active: true,
            metadata: String::new(),
        },
    );

    assert!(!dir.check_availability("alice").await);
    assert_eq!(dir.resolve_at("alice", NOW + 1).await.unwrap(), Some(owner));
    let listed = dir.list_by_owner(&owner).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "alice");

    assert!(matches!(
        dir.submit(&op, &secret).await,
        Err(ClientError::NameUnavailable(_))
    ));
    assert_eq!(rpc.sent_transactions().len(), 1);
}

#[tokio::test]
async fn expired_name_does_not_resolve() {
    let (dir, rpc, config) = setup();
    put(
        &rpc,
        &config,
        &DomainRecord {
            owner: [0x33; 32],
            name: "expired.carv".into(),
            registered_at: NOW - 1000,
            expires_at: NOW - 1,
            active: true,
            metadata: "still here".into(),
        },
    );

    assert_eq!(dir.resolve_at("expired.carv", NOW).await.unwrap(), None);
    let info = dir.get_info("expired.carv").await.unwrap().unwrap();
    assert!(info.record.active);
    assert_eq!(info.record.metadata, "still here");
}

#[tokio::test]
async fn unreachable_rpc_reports_unavailable_name() {
    let (dir, rpc, _) = setup();
    rpc.set_offline(true);
    assert!(!dir.check_availability("alice").await);
    assert!(matches!(
        dir.get_info("alice").await,
        Err(ClientError::Rpc(_))
    ));
}

#[tokio::test]
async fn permissive_node_cannot_leak_foreign_records() {
    let (dir, rpc, config) = setup();
    rpc.set_ignore_filters(true);
    for (name, owner) in [("mine", [1u8; 32]), ("theirs", [2u8; 32])] {
        put(
            &rpc,
            &config,
            &DomainRecord {
                owner,
                name: name.into(),
                registered_at: NOW,
                expires_at: NOW + 10,
                active: true,
                metadata: String::new(),
            },
        );
    }

    let listed = dir.list_by_owner(&[1; 32]).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "mine");
}

#[tokio::test]
async fn directory_and_scanner_share_one_backend() {
    let (_, rpc, config) = setup();
    let scanner = NftScanner::new(&config, Arc::clone(&rpc));
    let owner = [0x44u8; 32];

    let mut data = vec![0u8; 165];
    data[0..32].copy_from_slice(&[0xA1; 32]);
    data[32..64].copy_from_slice(&owner);
    data[64..72].copy_from_slice(&1u64.to_le_bytes());
    rpc.set_account([9; 32], TOKEN_PROGRAM_ID, data);

    let nfts = scanner.list_nfts(&owner).await.unwrap();
    assert_eq!(nfts.len(), 1);
    assert_eq!(nfts[0].holding.mint, [0xA1; 32]);
}
