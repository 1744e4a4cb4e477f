//! End-to-end tests of the NVMe handlers against a scripted SPDK backend.

use serde_json::json;
use spdk_bridge::models::{
    CreateNvmeControllerRequest, CreateNvmeNamespaceRequest, CreateNvmeSubsystemRequest,
    DeleteRequest, GetRequest, ListNvmeNamespacesRequest, ListNvmeSubsystemsRequest,
    NvmeController, NvmeNamespace, NvmeSubsystem, NvmeTransportType, StatsRequest,
    UpdateNvmeSubsystemRequest, NOT_REPORTED,
};
use spdk_bridge::{
    Bridge, Code, FieldMask, NvmeControllerService, NvmeNamespaceService, NvmeSubsystemService,
    StubBackend, StubReply,
};
use std::time::Duration;
use tempfile::TempDir;

const NQN: &str = "nqn.2022-09.io.spdk:opi3";
const SUBSYSTEM: &str = "nvmeSubsystems/subsystem-test";

async fn setup(replies: Vec<StubReply>) -> (TempDir, StubBackend, Bridge) {
    let dir = tempfile::tempdir().unwrap();
    let stub = StubBackend::start(dir.path().join("spdk.sock"), replies)
        .await
        .unwrap();
    let bridge = Bridge::builder()
        .backend_address(stub.address())
        .vfio_ctrlr_dir(dir.path())
        .call_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    (dir, stub, bridge)
}

fn version_reply() -> StubReply {
    StubReply::result(json!({
        "version": "SPDK v23.01",
        "fields": {"major": 23, "minor": 1, "patch": 0, "suffix": ""}
    }))
}

fn subsystem_request(id: &str) -> CreateNvmeSubsystemRequest {
    let mut subsystem = NvmeSubsystem::default();
    subsystem.spec.nqn = NQN.to_string();
    subsystem.spec.serial_number = "OpiSerialNumber".to_string();
    CreateNvmeSubsystemRequest {
        nvme_subsystem_id: id.to_string(),
        nvme_subsystem: Some(subsystem),
    }
}

fn namespace_request(id: &str, nsid: i32, volume: &str) -> CreateNvmeNamespaceRequest {
    let mut namespace = NvmeNamespace::default();
    namespace.spec.host_nsid = nsid;
    namespace.spec.volume_name_ref = volume.to_string();
    CreateNvmeNamespaceRequest {
        parent: SUBSYSTEM.to_string(),
        nvme_namespace_id: id.to_string(),
        nvme_namespace: Some(namespace),
    }
}

fn delete(name: &str, allow_missing: bool) -> DeleteRequest {
    DeleteRequest {
        name: name.to_string(),
        allow_missing,
    }
}

#[tokio::test]
async fn test_create_subsystem_success() {
    let (_dir, stub, bridge) = setup(vec![
        StubReply::raw(r#"{"id":1,"error":{"code":0},"result":true}"#),
        version_reply(),
    ])
    .await;

    let subsystem = bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap();

    assert_eq!(subsystem.name, SUBSYSTEM);
    assert_eq!(subsystem.spec.nqn, NQN);
    assert_eq!(subsystem.status.firmware_revision, "SPDK v23.01");

    let requests = stub.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "nvmf_create_subsystem");
    assert_eq!(requests[0].id, 1);
    let params = requests[0].params.as_ref().unwrap();
    assert_eq!(params["nqn"], NQN);
    assert_eq!(params["serial_number"], "OpiSerialNumber");
    assert_eq!(requests[1].method, "spdk_get_version");
    assert!(requests[1].params.is_none());
}

#[tokio::test]
async fn test_create_subsystem_rejected_by_backend() {
    let (_dir, _stub, bridge) = setup(vec![StubReply::raw(
        r#"{"id":1,"error":{"code":0},"result":false}"#,
    )])
    .await;

    let err = bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
    assert_eq!(err.to_string(), "Could not create NQN: nqn.2022-09.io.spdk:opi3");

    let lookup = bridge
        .nvme()
        .get_nvme_subsystem(GetRequest {
            name: SUBSYSTEM.to_string(),
        })
        .await;
    assert!(lookup.is_err());
}

#[tokio::test]
async fn test_create_subsystem_backend_error_is_verbatim() {
    let (_dir, _stub, bridge) = setup(vec![StubReply::error(-32602, "myopierr")]).await;

    let err = bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unknown);
    assert_eq!(
        err.to_string(),
        "nvmf_create_subsystem: json response error: myopierr"
    );
}

#[tokio::test]
async fn test_create_subsystem_empty_reply() {
    let (_dir, _stub, bridge) = setup(vec![StubReply::Close]).await;

    let err = bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "nvmf_create_subsystem: EOF");
}

#[tokio::test]
async fn test_create_subsystem_is_idempotent() {
    let (_dir, stub, bridge) = setup(vec![StubReply::result(json!(true)), version_reply()]).await;

    let first = bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap();
    let second = bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(stub.requests().await.len(), 2);
}

#[tokio::test]
async fn test_invalid_ids_never_reach_backend() {
    let (_dir, stub, bridge) = setup(vec![]).await;

    let err = bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("Bad_Id"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = bridge
        .nvme()
        .create_nvme_subsystem(CreateNvmeSubsystemRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "missing required field: nvme_subsystem");

    assert!(stub.requests().await.is_empty());
}

#[tokio::test]
async fn test_generated_id_when_none_given() {
    let (_dir, _stub, bridge) = setup(vec![StubReply::result(json!(true)), version_reply()]).await;

    let subsystem = bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request(""))
        .await
        .unwrap();
    let id = subsystem.name.strip_prefix("nvmeSubsystems/").unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn test_unknown_keys_are_not_found() {
    let (_dir, stub, bridge) = setup(vec![]).await;
    let name = "nvmeSubsystems/unknown-id";

    let err = bridge
        .nvme()
        .get_nvme_subsystem(GetRequest {
            name: name.to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
    assert_eq!(err.to_string(), "unable to find key nvmeSubsystems/unknown-id");

    let err = bridge
        .nvme()
        .stats_nvme_subsystem(StatsRequest {
            name: name.to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let mut update = NvmeSubsystem::default();
    update.name = name.to_string();
    let err = bridge
        .nvme()
        .update_nvme_subsystem(UpdateNvmeSubsystemRequest {
            nvme_subsystem: Some(update),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let err = bridge
        .nvme()
        .delete_nvme_subsystem(delete(name, false))
        .await
        .unwrap_err();
    assert!(err.to_string().contains(name));

    bridge
        .nvme()
        .delete_nvme_subsystem(delete(name, true))
        .await
        .unwrap();

    assert!(stub.requests().await.is_empty());
}

#[tokio::test]
async fn test_malformed_name_is_invalid() {
    let (_dir, _stub, bridge) = setup(vec![]).await;

    let err = bridge
        .nvme()
        .get_nvme_subsystem(GetRequest {
            name: "nvmeSubsystems//x".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_namespace_create_then_list() {
    let (_dir, stub, bridge) = setup(vec![
        StubReply::result(json!(true)),
        version_reply(),
        StubReply::result(json!(true)),
        StubReply::result(json!(22)),
    ])
    .await;

    bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap();

    let controller = bridge
        .nvme()
        .create_nvme_controller(CreateNvmeControllerRequest {
            parent: SUBSYSTEM.to_string(),
            nvme_controller_id: "controller-test".to_string(),
            nvme_controller: Some(NvmeController::default()),
        })
        .await
        .unwrap();
    assert_eq!(
        controller.name,
        "nvmeSubsystems/subsystem-test/nvmeControllers/controller-test"
    );
    assert!(controller.status.active);

    let namespace = bridge
        .nvme()
        .create_nvme_namespace(namespace_request("namespace-test", 22, "Malloc1"))
        .await
        .unwrap();
    assert_eq!(namespace.spec.host_nsid, 22);

    let listed = bridge
        .nvme()
        .list_nvme_namespaces(ListNvmeNamespacesRequest {
            parent: SUBSYSTEM.to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(listed
        .nvme_namespaces
        .iter()
        .any(|ns| ns.spec.host_nsid == 22));
    assert!(listed.next_page_token.is_empty());

    let requests = stub.requests().await;
    let listener = requests[2].params.as_ref().unwrap();
    assert_eq!(requests[2].method, "nvmf_subsystem_add_listener");
    assert_eq!(listener["nqn"], NQN);
    assert_eq!(listener["listen_address"]["trtype"], "TCP");
    assert_eq!(listener["listen_address"]["traddr"], "127.0.0.1");
    assert_eq!(listener["listen_address"]["trsvcid"], "4420");

    let add_ns = requests[3].params.as_ref().unwrap();
    assert_eq!(add_ns["namespace"]["nsid"], 22);
    assert_eq!(add_ns["namespace"]["bdev_name"], "Malloc1");
}

#[tokio::test]
async fn test_namespace_rejected_when_nsid_not_assigned() {
    let (_dir, _stub, bridge) = setup(vec![
        StubReply::result(json!(true)),
        version_reply(),
        StubReply::result(json!(0)),
    ])
    .await;

    bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap();
    let err = bridge
        .nvme()
        .create_nvme_namespace(namespace_request("ns0", 0, "Malloc0"))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not create NS: nvmeSubsystems/subsystem-test/nvmeNamespaces/ns0"
    );
}

#[tokio::test]
async fn test_child_requires_existing_parent() {
    let (_dir, stub, bridge) = setup(vec![]).await;

    let err = bridge
        .nvme()
        .create_nvme_namespace(namespace_request("ns0", 1, "Malloc0"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
    assert_eq!(err.to_string(), format!("unable to find key {}", SUBSYSTEM));

    let err = bridge
        .nvme()
        .create_nvme_controller(CreateNvmeControllerRequest {
            parent: String::new(),
            nvme_controller_id: "c0".to_string(),
            nvme_controller: Some(NvmeController::default()),
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "missing required field: parent");

    assert!(stub.requests().await.is_empty());
}

#[tokio::test]
async fn test_parent_with_children_cannot_be_deleted() {
    let (_dir, stub, bridge) = setup(vec![
        StubReply::result(json!(true)),
        version_reply(),
        StubReply::result(json!(5)),
        StubReply::result(json!(true)),
        StubReply::result(json!(true)),
    ])
    .await;

    bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap();
    let namespace = bridge
        .nvme()
        .create_nvme_namespace(namespace_request("ns0", 0, "Malloc0"))
        .await
        .unwrap();
    assert_eq!(namespace.spec.host_nsid, 5);

    let err = bridge
        .nvme()
        .delete_nvme_subsystem(delete(SUBSYSTEM, false))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);
    assert_eq!(stub.requests().await.len(), 3);

    bridge
        .nvme()
        .delete_nvme_namespace(delete(&namespace.name, false))
        .await
        .unwrap();
    bridge
        .nvme()
        .delete_nvme_subsystem(delete(SUBSYSTEM, false))
        .await
        .unwrap();

    let requests = stub.requests().await;
    assert_eq!(requests[3].method, "nvmf_subsystem_remove_ns");
    assert_eq!(requests[3].params.as_ref().unwrap()["nsid"], 5);
    assert_eq!(requests[4].method, "nvmf_delete_subsystem");
    assert_eq!(requests[4].params.as_ref().unwrap()["nqn"], NQN);
}

#[tokio::test]
async fn test_delete_subsystem_rejected_by_backend() {
    let (_dir, _stub, bridge) = setup(vec![
        StubReply::result(json!(true)),
        version_reply(),
        StubReply::result(json!(false)),
    ])
    .await;

    bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap();
    let err = bridge
        .nvme()
        .delete_nvme_subsystem(delete(SUBSYSTEM, false))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Could not delete NQN: nqn.2022-09.io.spdk:opi3");

    // Still tracked after a failed delete.
    assert!(bridge
        .nvme()
        .get_nvme_subsystem(GetRequest {
            name: SUBSYSTEM.to_string()
        })
        .await
        .is_ok());
}

#[tokio::test]
async fn test_update_mask_validation() {
    let (_dir, _stub, bridge) = setup(vec![]).await;

    let mut update = NvmeSubsystem::default();
    update.name = SUBSYSTEM.to_string();

    let err = bridge
        .nvme()
        .update_nvme_subsystem(UpdateNvmeSubsystemRequest {
            nvme_subsystem: Some(update.clone()),
            update_mask: FieldMask::new(["*", "spec.serial_number"]),
            allow_missing: false,
        })
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid field path: '*' must not be used with other paths"
    );

    let err = bridge
        .nvme()
        .update_nvme_subsystem(UpdateNvmeSubsystemRequest {
            nvme_subsystem: Some(update),
            update_mask: FieldMask::new(["spec.nqn"]),
            allow_missing: false,
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid field path: spec.nqn");
}

#[tokio::test]
async fn test_update_applies_masked_fields_only() {
    let (_dir, stub, bridge) = setup(vec![StubReply::result(json!(true)), version_reply()]).await;

    bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap();

    let mut update = NvmeSubsystem::default();
    update.name = SUBSYSTEM.to_string();
    update.spec.serial_number = "NewSerial".to_string();
    update.spec.model_number = "NewModel".to_string();

    let updated = bridge
        .nvme()
        .update_nvme_subsystem(UpdateNvmeSubsystemRequest {
            nvme_subsystem: Some(update),
            update_mask: FieldMask::new(["spec.serial_number"]),
            allow_missing: false,
        })
        .await
        .unwrap();
    assert_eq!(updated.spec.serial_number, "NewSerial");
    assert_eq!(updated.spec.model_number, "");
    assert_eq!(updated.spec.nqn, NQN);

    let fetched = bridge
        .nvme()
        .get_nvme_subsystem(GetRequest {
            name: SUBSYSTEM.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(fetched, updated);
    assert_eq!(stub.requests().await.len(), 2);
}

#[tokio::test]
async fn test_update_allow_missing_creates() {
    let (_dir, stub, bridge) = setup(vec![StubReply::result(json!(true)), version_reply()]).await;

    let mut update = NvmeSubsystem::default();
    update.name = SUBSYSTEM.to_string();
    update.spec.nqn = NQN.to_string();

    let created = bridge
        .nvme()
        .update_nvme_subsystem(UpdateNvmeSubsystemRequest {
            nvme_subsystem: Some(update),
            update_mask: FieldMask::default(),
            allow_missing: true,
        })
        .await
        .unwrap();
    assert_eq!(created.name, SUBSYSTEM);
    assert_eq!(stub.requests().await[0].method, "nvmf_create_subsystem");
}

#[tokio::test]
async fn test_list_subsystems_pages() {
    let mut replies = Vec::new();
    for _ in 0..3 {
        replies.push(StubReply::result(json!(true)));
        replies.push(version_reply());
    }
    let (_dir, _stub, bridge) = setup(replies).await;

    for id in ["sub-c", "sub-a", "sub-b"] {
        bridge
            .nvme()
            .create_nvme_subsystem(subsystem_request(id))
            .await
            .unwrap();
    }

    let first = bridge
        .nvme()
        .list_nvme_subsystems(ListNvmeSubsystemsRequest {
            page_size: 2,
            page_token: String::new(),
        })
        .await
        .unwrap();
    let names: Vec<&str> = first.nvme_subsystems.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["nvmeSubsystems/sub-a", "nvmeSubsystems/sub-b"]);
    assert!(!first.next_page_token.is_empty());

    let second = bridge
        .nvme()
        .list_nvme_subsystems(ListNvmeSubsystemsRequest {
            page_size: 2,
            page_token: first.next_page_token,
        })
        .await
        .unwrap();
    assert_eq!(second.nvme_subsystems.len(), 1);
    assert_eq!(second.nvme_subsystems[0].name, "nvmeSubsystems/sub-c");
    assert!(second.next_page_token.is_empty());

    let err = bridge
        .nvme()
        .list_nvme_subsystems(ListNvmeSubsystemsRequest {
            page_size: 0,
            page_token: "unknown-pagination-token".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let err = bridge
        .nvme()
        .list_nvme_subsystems(ListNvmeSubsystemsRequest {
            page_size: -10,
            page_token: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "negative PageSize is not allowed");
}

#[tokio::test]
async fn test_stats_sum_namespace_volumes() {
    let (_dir, stub, bridge) = setup(vec![
        StubReply::result(json!(true)),
        version_reply(),
        StubReply::result(json!(1)),
        StubReply::result(json!({
            "tick_rate": 2490000000u64,
            "ticks": 1000,
            "bdevs": [
                {"name": "Malloc1", "bytes_read": 4096, "num_read_ops": 1},
                {"name": "Unrelated", "bytes_read": 999999}
            ]
        })),
        StubReply::result(json!({
            "tick_rate": 2490000000u64,
            "ticks": 1000,
            "bdevs": [{"name": "Malloc1", "bytes_read": 4096, "num_read_ops": 1}]
        })),
    ])
    .await;

    bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap();
    let namespace = bridge
        .nvme()
        .create_nvme_namespace(namespace_request("ns1", 1, "Malloc1"))
        .await
        .unwrap();

    let stats = bridge
        .nvme()
        .stats_nvme_subsystem(StatsRequest {
            name: SUBSYSTEM.to_string(),
        })
        .await
        .unwrap()
        .stats;
    assert_eq!(stats.read_bytes_count, 4096);
    assert_eq!(stats.read_ops_count, 1);
    assert_eq!(stats.write_bytes_count, NOT_REPORTED);

    let stats = bridge
        .nvme()
        .stats_nvme_namespace(StatsRequest {
            name: namespace.name.clone(),
        })
        .await
        .unwrap()
        .stats;
    assert_eq!(stats.read_bytes_count, 4096);
    assert_eq!(stats.unmap_latency_ticks, NOT_REPORTED);

    let requests = stub.requests().await;
    assert!(requests[3].params.as_ref().unwrap().get("name").is_none());
    assert_eq!(requests[4].params.as_ref().unwrap()["name"], "Malloc1");
}

#[tokio::test]
async fn test_stats_without_namespaces_skips_backend() {
    let (_dir, stub, bridge) = setup(vec![StubReply::result(json!(true)), version_reply()]).await;

    bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap();
    let stats = bridge
        .nvme()
        .stats_nvme_subsystem(StatsRequest {
            name: SUBSYSTEM.to_string(),
        })
        .await
        .unwrap()
        .stats;
    assert_eq!(stats.read_bytes_count, NOT_REPORTED);
    assert_eq!(stub.requests().await.len(), 2);
}

#[tokio::test]
async fn test_vfio_user_controller_lifecycle() {
    let (dir, stub, bridge) = setup(vec![
        StubReply::result(json!(true)),
        version_reply(),
        StubReply::result(json!(true)),
        StubReply::result(json!(true)),
    ])
    .await;

    bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap();

    let mut controller = NvmeController::default();
    controller.spec.trtype = NvmeTransportType::VfioUser;
    let created = bridge
        .nvme()
        .create_nvme_controller(CreateNvmeControllerRequest {
            parent: SUBSYSTEM.to_string(),
            nvme_controller_id: "ctrl-vfio".to_string(),
            nvme_controller: Some(controller),
        })
        .await
        .unwrap();

    let socket_dir = dir.path().join("ctrl-vfio");
    assert!(socket_dir.is_dir());

    let requests = stub.requests().await;
    let listen = &requests[2].params.as_ref().unwrap()["listen_address"];
    assert_eq!(listen["trtype"], "VFIOUSER");
    assert_eq!(listen["traddr"], socket_dir.display().to_string());
    assert!(listen.get("trsvcid").is_none());

    // The target leaves its socket and bar files behind.
    std::fs::write(socket_dir.join("cntrl"), b"").unwrap();
    std::fs::write(socket_dir.join("bar0"), b"").unwrap();

    bridge
        .nvme()
        .delete_nvme_controller(delete(&created.name, false))
        .await
        .unwrap();
    assert!(!socket_dir.exists());

    let requests = stub.requests().await;
    assert_eq!(requests[3].method, "nvmf_subsystem_remove_listener");
    assert_eq!(
        requests[3].params.as_ref().unwrap()["listen_address"],
        requests[2].params.as_ref().unwrap()["listen_address"]
    );
}

#[tokio::test]
async fn test_rejected_vfio_user_controller_removes_directory() {
    let (dir, stub, bridge) = setup(vec![
        StubReply::result(json!(true)),
        version_reply(),
        StubReply::result(json!(false)),
        StubReply::error(-32602, "Invalid parameters"),
    ])
    .await;

    bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap();

    let request = || {
        let mut controller = NvmeController::default();
        controller.spec.trtype = NvmeTransportType::VfioUser;
        CreateNvmeControllerRequest {
            parent: SUBSYSTEM.to_string(),
            nvme_controller_id: "ctrl-vfio".to_string(),
            nvme_controller: Some(controller),
        }
    };
    let socket_dir = dir.path().join("ctrl-vfio");

    let err = bridge
        .nvme()
        .create_nvme_controller(request())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not create CTRL: nvmeSubsystems/subsystem-test/nvmeControllers/ctrl-vfio"
    );
    assert!(!socket_dir.exists());

    let err = bridge
        .nvme()
        .create_nvme_controller(request())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "nvmf_subsystem_add_listener: json response error: Invalid parameters"
    );
    assert!(!socket_dir.exists());

    assert_eq!(stub.requests().await.len(), 4);
    let err = bridge
        .nvme()
        .get_nvme_controller(GetRequest {
            name: format!("{}/nvmeControllers/ctrl-vfio", SUBSYSTEM),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn test_controller_create_rejected() {
    let (_dir, _stub, bridge) = setup(vec![
        StubReply::result(json!(true)),
        version_reply(),
        StubReply::result(json!(false)),
    ])
    .await;

    bridge
        .nvme()
        .create_nvme_subsystem(subsystem_request("subsystem-test"))
        .await
        .unwrap();
    let err = bridge
        .nvme()
        .create_nvme_controller(CreateNvmeControllerRequest {
            parent: SUBSYSTEM.to_string(),
            nvme_controller_id: "c0".to_string(),
            nvme_controller: Some(NvmeController::default()),
        })
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not create CTRL: nvmeSubsystems/subsystem-test/nvmeControllers/c0"
    );
}

#[tokio::test]
async fn test_shutdown_cancels_backend_calls() {
    let (_dir, stub, bridge) = setup(vec![StubReply::Silent]).await;

    let pending = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.backend_version().await })
    };
    // Let the call reach the backend before cancelling.
    while stub.requests().await.is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bridge.shutdown();

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.code(), Code::Cancelled);
    assert_eq!(err.to_string(), "spdk_get_version: call cancelled");

    let err = bridge.backend_version().await.unwrap_err();
    assert_eq!(err.code(), Code::Cancelled);
}
