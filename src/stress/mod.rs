//! Internal stress tests for the shared topology store.
//!
//! Many routers read slot owners while others patch single slots and
//! replace the whole table. Readers must always see one complete owner per
//! slot, never a torn table.

use std::sync::Arc;

use crate::cluster::{key_slot, Action, TopologyStore, SLOT_COUNT};
use crate::core::command::Cmd;
use crate::Router;

const CLUSTER: &str = "backend";

fn dump(port_base: u16) -> String {
    format!(
        "a 127.0.0.1:{}@1 master - 0 0 1 connected 0-8191\n\
         b 127.0.0.1:{}@1 master - 0 0 2 connected 8192-16383\n",
        port_base,
        port_base + 1
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_during_replace() {
    let store = Arc::new(TopologyStore::new());
    store.replace_all(CLUSTER, &dump(7000)).unwrap();

    let mut handles = Vec::new();

    for round in 0..8u16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..200u16 {
                let base = if (round + i) % 2 == 0 { 7000 } else { 8000 };
                store.replace_all(CLUSTER, &dump(base)).unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }

    for _ in 0..32 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for slot in (0..SLOT_COUNT).step_by(7) {
                let owner = store.lookup(CLUSTER, slot).expect("slot lost during replace");
                let port: u16 = owner.rsplit(':').next().unwrap().parse().unwrap();
                assert!(
                    matches!(port, 7000 | 7001 | 8000 | 8001),
                    "unexpected owner {}",
                    owner
                );
                if slot % 512 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
    assert!(!store.bootstrap_needed(CLUSTER));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_patches_are_not_lost() {
    let store = Arc::new(TopologyStore::new());
    store.replace_all(CLUSTER, &dump(7000)).unwrap();

    let mut handles = Vec::new();
    for worker in 0..16u16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            // Each worker owns a disjoint set of slots.
            for slot in (worker..SLOT_COUNT).step_by(16) {
                store.patch_one(CLUSTER, slot, &format!("10.0.0.{}:6379", worker));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for slot in 0..SLOT_COUNT {
        let expected = format!("10.0.0.{}:6379", slot % 16);
        assert_eq!(store.lookup(CLUSTER, slot).as_deref(), Some(expected.as_str()));
    }
    assert_eq!(store.covered_slots(CLUSTER), usize::from(SLOT_COUNT));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_routers_share_moved_updates() {
    let store = Arc::new(TopologyStore::new());
    store.replace_all(CLUSTER, &dump(7000)).unwrap();

    let mut handles = Vec::new();
    for worker in 0..64u32 {
        let router = Router::builder().store(store.clone()).build().unwrap();
        handles.push(tokio::spawn(async move {
            let key = format!("key:{}", worker);
            let slot = key_slot(key.as_bytes());

            let mut client = router.decoder();
            client.append(&Cmd::new("GET").arg(key).encode());
            let mut request = router.accept(CLUSTER, &mut client).unwrap().unwrap();
            assert!(matches!(request.start(), Action::Dispatch { .. }));

            let mut backend = router.decoder();
            backend.append(format!("-MOVED {} 127.0.0.1:9000\r\n", slot).as_bytes());
            match request.on_reply(&mut backend) {
                Action::Dispatch { node, .. } => {
                    assert_eq!(node.as_deref(), Some("127.0.0.1:9000"));
                }
                other => panic!("unexpected {:?}", other),
            }
            slot
        }));
    }

    for handle in handles {
        let slot = handle.await.unwrap();
        assert_eq!(store.lookup(CLUSTER, slot).as_deref(), Some("127.0.0.1:9000"));
    }
}
