use std::sync::Arc;

use bitcaskd::net::{Client, Server};
use bitcaskd::storage::bitcask::Config;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[tokio::test]
async fn set_get_del_round_trip_over_the_wire() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Config::default().open(dir.path()).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = Server::new(listener, db, async {
        let _ = shutdown_rx.await;
    });
    let server_task = tokio::spawn(server.run());

    let mut client = Client::connect("127.0.0.1", addr.port()).await.unwrap();
    assert_eq!(client.send("set alpha 1").await.unwrap(), "set success");
    assert_eq!(client.send("get alpha").await.unwrap(), "1");
    assert_eq!(client.send("del alpha").await.unwrap(), "del success");
    assert_eq!(client.send("get alpha").await.unwrap(), "key not found");
    assert_eq!(client.send("frobnicate x").await.unwrap(), "invalid command");

    let _ = shutdown_tx.send(());
    server_task.await.unwrap();
}
