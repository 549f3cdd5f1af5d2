#![cfg(feature = "test-util")]

use pioneer_avr::transport::mock::MockTransport;
use pioneer_avr::{AvrClient, AvrError, PlayerCommand, SessionConfig, StateReceiver, StateUpdate, Zone};
use std::time::Duration;

async fn next_with(updates: &mut StateReceiver, name: &str) -> StateUpdate {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let update = updates.recv().await.unwrap();
            if update.get(name).is_some() {
                return update;
            }
        }
    })
    .await
    .unwrap()
}

async fn wait_for_line(mock: &MockTransport, line: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !mock.written_lines().iter().any(|l| l == line) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn reports_become_state_updates() {
    let mock = MockTransport::new();
    mock.respond(b"?P\r\n", b"PWR0\r\n");
    mock.respond(b"?V\r\n", b"VOL121\r\n");
    mock.respond(b"?RGB05\r\n", b"RGB051LIVINGROOM\r\n");

    let client = AvrClient::spawn(mock.clone(), SessionConfig::default()).unwrap();
    let mut updates = client.subscribe_state();

    let update = next_with(&mut updates, "volume").await;
    assert_eq!(update.get("volumeStraight"), Some("-20"));

    mock.push_inbound(b"FN05\r\n");
    let update = next_with(&mut updates, "input").await;
    assert_eq!(update.get("input"), Some("livingroom"));

    let state = client.snapshot().await.unwrap();
    assert_eq!(state.reading("power"), Some("on"));
    assert_eq!(state.active_input.as_deref(), Some("05"));

    client.shutdown().await;
}

#[tokio::test]
async fn commands_are_written_as_lines() {
    let mock = MockTransport::new();
    let config = SessionConfig {
        volume_limit_db: -20.0,
        ..Default::default()
    };
    let client = AvrClient::spawn(mock.clone(), config).unwrap();
    wait_for_line(&mock, "?RGB59").await;

    client.power(true).await.unwrap();
    client.mute(false).await.unwrap();
    client.select_input("44").await.unwrap();
    // capped at -20 dB
    client.set_volume_db(0.0).await.unwrap();

    let lines = mock.written_lines();
    let tail = &lines[lines.len() - 4..];
    assert_eq!(tail, ["PO", "MF", "44FN", "121VL"]);

    assert!(matches!(
        client.set_volume_percent(150.0).await,
        Err(AvrError::InvalidParameter(_))
    ));

    client.shutdown().await;
}

#[tokio::test]
async fn player_needs_a_player_input() {
    let mock = MockTransport::new();
    let client = AvrClient::spawn(mock.clone(), SessionConfig::default()).unwrap();
    let mut updates = client.subscribe_state();

    mock.push_inbound(b"FN19\r\n");
    next_with(&mut updates, "input").await;
    assert!(matches!(
        client.player(PlayerCommand::Play).await,
        Err(AvrError::Unsupported(_))
    ));

    mock.push_inbound(b"FN38\r\n");
    next_with(&mut updates, "input").await;
    client.player(PlayerCommand::Next).await.unwrap();
    wait_for_line(&mock, "13NW").await;

    client.shutdown().await;
}

#[tokio::test]
async fn zone_lines_reach_registered_consumers() {
    let mock = MockTransport::new();
    let client = AvrClient::spawn(mock.clone(), SessionConfig::default()).unwrap();
    let mut consumer = client.zones().register(Zone::Zone3, "^YV").unwrap();

    mock.push_inbound(b"YV30\r\n");
    let line = tokio::time::timeout(Duration::from_secs(5), consumer.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(line.zone, Zone::Zone3);
    assert_eq!(line.line, "YV30");

    client.shutdown().await;
}

#[tokio::test]
async fn shutdown_closes_the_link() {
    let mock = MockTransport::new();
    let client = AvrClient::spawn(mock.clone(), SessionConfig::default()).unwrap();
    wait_for_line(&mock, "?P").await;

    client.shutdown().await;
    assert_eq!(mock.close_count(), 1);
}
