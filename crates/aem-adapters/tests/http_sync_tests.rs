use aem_adapters::{HttpInstanceSync, SyncOptions};
use aem_core::{AemError, Instance, InstanceSync, SyncRequest};
use std::time::Duration;

#[tokio::test]
async fn refused_connection_is_recoverable() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let sync = HttpInstanceSync::new(&SyncOptions { connect_timeout: Duration::from_secs(2),
                                                    ..SyncOptions::default() }).unwrap();
    let instance = Instance::new("local-author", format!("http://127.0.0.1:{port}"));
    let err = sync.call(&instance, SyncRequest::get("/system/console/bundles.json")).await.unwrap_err();
    assert!(matches!(err, AemError::RemoteCommunication { ref instance, .. } if instance == "local-author"));
    assert!(err.is_recoverable());
}
