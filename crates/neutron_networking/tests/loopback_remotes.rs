//! End-to-end tests: one server and several clients on a loopback network,
//! running the same endpoint declarations on both sides.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use neutron_core::{Callback, Scheduler};
use neutron_networking::{
    ClientId, Direction, EndpointError, EndpointResult, LoopbackNetwork, RemoteEvent,
    RemoteFunction, Remotes,
};
use neutron_shared::{LoopbackConfig, NamerConfig};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct ChatLine {
    author: String,
    text: String,
}

// Shared declarations. Both sides call these, so the call sites match.

fn chat(
    remotes: &Remotes,
) -> impl Future<Output = EndpointResult<RemoteEvent<ChatLine>>> + Send + 'static {
    remotes.event(Direction::Bidirectional)
}

fn announcements(
    remotes: &Remotes,
) -> impl Future<Output = EndpointResult<RemoteEvent<String>>> + Send + 'static {
    remotes.event(Direction::ServerToClient)
}

fn add(
    remotes: &Remotes,
) -> impl Future<Output = EndpointResult<RemoteFunction<(i64, i64), i64>>> + Send + 'static {
    remotes.function(Direction::ClientToServer)
}

fn confirm(
    remotes: &Remotes,
) -> impl Future<Output = EndpointResult<RemoteFunction<String, bool>>> + Send + 'static {
    remotes.function(Direction::ServerToClient)
}

struct World {
    network: LoopbackNetwork,
    server: Arc<Remotes>,
}

fn world(seed: u64) -> World {
    let network = LoopbackNetwork::new(Scheduler::current().unwrap(), &LoopbackConfig::default());
    let server = Remotes::server(network.server_host(), seed, &NamerConfig::default());
    World { network, server }
}

async fn join(world: &World) -> Arc<Remotes> {
    Remotes::client(world.network.connect_client(), &NamerConfig::default()).await
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

#[tokio::test]
async fn test_both_sides_derive_the_same_wire_names() {
    let world = world(42);
    chat(&world.server).await.unwrap();
    add(&world.server).await.unwrap();

    let client = join(&world).await;
    assert_eq!(client.seed(), 42);
    chat(&client).await.unwrap();
    add(&client).await.unwrap();

    assert_eq!(world.server.endpoints(), client.endpoints());
    assert_eq!(world.network.event_names().len(), 1);
    assert_eq!(world.network.function_names().len(), 1);
}

#[tokio::test]
async fn test_client_attach_waits_for_server_declaration() {
    let world = world(7);
    let client = join(&world).await;

    let attach = tokio::spawn(announcements(&client));
    settle().await;
    assert!(!attach.is_finished());

    announcements(&world.server).await.unwrap();
    let event = attach.await.unwrap().unwrap();
    assert_eq!(event.info().direction, Direction::ServerToClient);
}

#[tokio::test]
async fn test_events_flow_both_ways() {
    let world = world(1);
    let server_chat = chat(&world.server).await.unwrap();
    let alice = join(&world).await;
    let bob = join(&world).await;
    let alice_chat = chat(&alice).await.unwrap();
    let bob_chat = chat(&bob).await.unwrap();

    let (to_server, mut server_rx) = mpsc::unbounded_channel();
    server_chat
        .on_server_event(move |client, line: ChatLine| {
            let _ = to_server.send((client, line));
        })
        .unwrap();

    let (to_bob, mut bob_rx) = mpsc::unbounded_channel();
    bob_chat
        .on_client_event(move |line: ChatLine| {
            let _ = to_bob.send(line);
        })
        .unwrap();
    let alice_seen = Arc::new(Mutex::new(Vec::new()));
    {
        let alice_seen = Arc::clone(&alice_seen);
        alice_chat
            .on_client_event(move |line: ChatLine| alice_seen.lock().push(line))
            .unwrap();
    }

    let line = ChatLine {
        author: "alice".into(),
        text: "hi".into(),
    };
    alice_chat.fire_server(&line).unwrap();
    let (from, received) = server_rx.recv().await.unwrap();
    assert_eq!(from, ClientId(1));
    assert_eq!(received, line);

    server_chat.fire_except(from, &received).unwrap();
    assert_eq!(bob_rx.recv().await.unwrap(), line);
    settle().await;
    assert!(alice_seen.lock().is_empty());

    server_chat.fire_all(&line).unwrap();
    server_chat.fire_clients(&[ClientId(2)], &line).unwrap();
    assert_eq!(bob_rx.recv().await.unwrap(), line);
    assert_eq!(bob_rx.recv().await.unwrap(), line);
    settle().await;
    assert_eq!(alice_seen.lock().len(), 1);
}

#[tokio::test]
async fn test_functions_round_trip() {
    let world = world(3);
    let server_add = add(&world.server).await.unwrap();
    let server_confirm = confirm(&world.server).await.unwrap();
    server_add
        .handle_server(|_client, (a, b): (i64, i64)| async move { a + b })
        .unwrap();

    let client = join(&world).await;
    let client_add = add(&client).await.unwrap();
    let client_confirm = confirm(&client).await.unwrap();
    client_confirm
        .handle_client(|question: String| async move { question.ends_with('?') })
        .unwrap();

    assert_eq!(client_add.invoke_server(&(2, 40)).await.unwrap(), 42);
    assert!(server_confirm
        .invoke_client(ClientId(1), &"ready?".to_string())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_invocation_waits_for_handler() {
    let world = world(5);
    let server_add = add(&world.server).await.unwrap();
    let client = join(&world).await;
    let client_add = add(&client).await.unwrap();

    let call = tokio::spawn(client_add.invoke_server(&(1, 1)));
    settle().await;
    assert!(!call.is_finished());

    server_add
        .handle_server(|_client, (a, b): (i64, i64)| async move { a * b })
        .unwrap();
    assert_eq!(call.await.unwrap().unwrap(), 1);
}

#[tokio::test]
async fn test_invoke_client_fails_when_client_leaves() {
    let world = world(9);
    let server_confirm = confirm(&world.server).await.unwrap();
    let client = join(&world).await;
    let client_confirm = confirm(&client).await.unwrap();
    client_confirm
        .handle_client(|_question: String| std::future::pending::<bool>())
        .unwrap();

    let call = tokio::spawn(server_confirm.invoke_client(ClientId(1), &"still there?".to_string()));
    settle().await;
    assert!(!call.is_finished());

    assert!(world.network.disconnect(ClientId(1)));
    assert!(matches!(
        call.await.unwrap(),
        Err(EndpointError::Disconnected)
    ));
}

#[tokio::test]
async fn test_direction_and_side_are_enforced() {
    let world = world(11);
    let server_news = announcements(&world.server).await.unwrap();
    let server_add = add(&world.server).await.unwrap();
    let client = join(&world).await;
    let client_news = announcements(&client).await.unwrap();
    let client_add = add(&client).await.unwrap();

    let news = "server restarting".to_string();
    assert!(matches!(
        client_news.fire_server(&news),
        Err(EndpointError::DirectionViolation { .. })
    ));
    assert!(matches!(
        server_news.fire_server(&news),
        Err(EndpointError::WrongSide { .. })
    ));
    assert!(matches!(
        server_news.on_server_event(|_, _: String| {}),
        Err(EndpointError::DirectionViolation { .. })
    ));
    assert!(matches!(
        client_news.fire_all(&news),
        Err(EndpointError::WrongSide { .. })
    ));
    assert!(matches!(
        server_add.invoke_client(ClientId(1), &(1, 2)).await,
        Err(EndpointError::DirectionViolation { .. })
    ));
    assert!(matches!(
        client_add.handle_server(|_, _: (i64, i64)| async { 0 }),
        Err(EndpointError::WrongSide { .. })
    ));
}

#[tokio::test]
async fn test_named_endpoints() {
    let world = world(13);
    let lobby = world
        .server
        .named_event::<String>("Lobby", Direction::Bidirectional)
        .await
        .unwrap();
    assert_eq!(lobby.info().wire_name, "Lobby");
    assert_eq!(world.network.event_names(), vec!["Lobby".to_string()]);

    let taken = world
        .server
        .named_function::<(), ()>("Lobby", Direction::Bidirectional)
        .await;
    assert!(matches!(taken, Err(EndpointError::NameTaken(name)) if name == "Lobby"));

    let client = join(&world).await;
    let client_lobby = client
        .named_event::<String>("Lobby", Direction::Bidirectional)
        .await
        .unwrap();
    assert_eq!(client_lobby.info(), lobby.info());
}

#[tokio::test]
async fn test_malformed_payload_is_dropped() {
    let world = world(17);
    let server_chat = world
        .server
        .named_event::<ChatLine>("Chat", Direction::Bidirectional)
        .await
        .unwrap();
    let client = join(&world).await;
    // Same wire name, different payload type.
    let client_numbers = client
        .named_event::<u32>("Chat", Direction::Bidirectional)
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    server_chat
        .on_server_event(move |_, line: ChatLine| {
            let _ = tx.send(line);
        })
        .unwrap();

    client_numbers.fire_server(&5).unwrap();
    settle().await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_presence_replays_connected_clients() {
    let world = world(19);
    let _first = join(&world).await;
    let _second = join(&world).await;
    settle().await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = {
        let seen = Arc::clone(&seen);
        Callback::from_fn(move |client: ClientId| seen.lock().push(client))
    };
    world.network.presence().joined().register(recorder, "scoreboard");
    let _third = join(&world).await;
    settle().await;

    let mut seen = seen.lock().clone();
    seen.sort();
    assert_eq!(seen, vec![ClientId(1), ClientId(2), ClientId(3)]);
}

#[tokio::test]
async fn test_unusable_namer_settings_do_not_break_declaration() {
    let network = LoopbackNetwork::new(Scheduler::current().unwrap(), &LoopbackConfig::default());
    let inverted = NamerConfig {
        min_code_point: 126,
        max_code_point: 33,
        ..NamerConfig::default()
    };
    let server = Remotes::server(network.server_host(), 42, &inverted);

    let event = chat(&server).await.unwrap();
    assert_eq!(
        event.info().wire_name.chars().count(),
        NamerConfig::default().name_length
    );
}
