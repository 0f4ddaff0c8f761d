//! Exercises a `SocketConnection` the way a real transport loop would:
//! bridge a security context onto it once, then push several inbound
//! envelopes through and inspect what comes back out, including the
//! callback-stub lifecycle riding alongside method calls.

use std::sync::Arc;

use remotecore::registry::{MethodOptions, ParamDescriptor, ParamKind, RemoteMethodRegistry};
use remotecore::security::group::{SecurityGroupOptions, SecurityGroupRegistry};
use remotecore::session::CookieSession;
use remotecore::token::TokenBox;
use remotecore_socket::{BridgePayload, SocketConnection, TokenBridge};
use remotecore_socket::codec::ExtValue;
use remotecore_socket::message::{Envelope, MethodCall};

fn wire_up() -> (Arc<SocketConnection>, tokio::sync::mpsc::UnboundedReceiver<String>, Arc<TokenBox>) {
    let groups = Arc::new(SecurityGroupRegistry::new());
    let gid = groups.register(SecurityGroupOptions { dev_disable_security: true, ..Default::default() });
    let registry = Arc::new(RemoteMethodRegistry::new());

    registry.class("Carts", gid).method(
        "total",
        vec![
            ParamDescriptor { name: "a".into(), kind: ParamKind::Number, variadic: false },
            ParamDescriptor { name: "b".into(), kind: ParamKind::Number, variadic: false },
        ],
        Some(MethodOptions { is_safe: true, ..Default::default() }),
        Arc::new(|_ctx, args| Box::pin(async move {
            let sum: f64 = args.iter().filter_map(|v| v.as_f64()).sum();
            Ok(serde_json::Value::from(sum))
        })),

    );

    let token_box = Arc::new(TokenBox::from_secret(b"a reasonably long shared secret").unwrap());
    let (outbound_tx, outbound_rx) = tokio::sync::mpsc::unbounded_channel();
    let (connection, _freed, _calls) = SocketConnection::new(registry, groups, token_box.clone(), outbound_tx);
    (connection, outbound_rx, token_box)
}

#[tokio::test]
async fn two_calls_over_one_bridged_connection_both_get_replies() {
    let (connection, mut outbound, token_box) = wire_up();

    let bridge = TokenBridge::new(&token_box);
    let token = bridge.mint(BridgePayload {
        socket_id: connection.id,
        security: Default::default(),
        session: CookieSession::anonymous(),
        covers_groups: vec![],
    }).unwrap();
    connection.accept_bridge_token(&token).unwrap();

    for (call_id, a, b) in [(1u64, 2.0, 3.0), (2u64, 10.0, -4.0)] {
        let call = MethodCall {
            call_id,
            server_session_class_id: "Carts".into(),
            method_name: "total".into(),
            args: vec![ExtValue::Number(a), ExtValue::Number(b)],
        };
        connection.handle_method_call(call).await.unwrap();
    }

    let first: Envelope = serde_json::from_str(&outbound.recv().await.unwrap()).unwrap();
    let second: Envelope = serde_json::from_str(&outbound.recv().await.unwrap()).unwrap();

    match first {
        Envelope::MethodCallResult(r) => {
            assert_eq!(r.call_id, 1);
            assert_eq!(r.result, Some(ExtValue::Number(5.0)));
        }
        other => panic!("expected methodCallResult, got {other:?}"),
    }

    match second {
        Envelope::MethodCallResult(r) => {
            assert_eq!(r.call_id, 2);
            assert_eq!(r.result, Some(ExtValue::Number(6.0)));
        }
        other => panic!("expected methodCallResult, got {other:?}"),
    }
}

#[tokio::test]
async fn an_unknown_method_over_the_socket_replies_with_an_error_envelope_not_a_fatal_frame() {
    let (connection, mut outbound, token_box) = wire_up();

    let bridge = TokenBridge::new(&token_box);
    let token = bridge.mint(BridgePayload {
        socket_id: connection.id,
        security: Default::default(),
        session: CookieSession::anonymous(),
        covers_groups: vec![],
    }).unwrap();
    connection.accept_bridge_token(&token).unwrap();

    let call = MethodCall {
        call_id: 9,
        server_session_class_id: "Carts".into(),
        method_name: "noSuchMethod".into(),
        args: vec![],
    };
    connection.handle_method_call(call).await.unwrap();

    let frame = outbound.recv().await.unwrap();
    assert!(remotecore_socket::message::as_fatal_message(&frame).is_none());
    match serde_json::from_str::<Envelope>(&frame).unwrap() {
        Envelope::MethodCallResult(r) => {
            assert_eq!(r.call_id, 9);
            assert!(r.result.is_none());
            assert!(r.error.is_some());
            assert_eq!(r.http_status_code, 404);
        }
        other => panic!("expected methodCallResult, got {other:?}"),
    }
}

#[tokio::test]
async fn dropping_a_callback_handle_frees_its_slot_in_the_connections_registry() {
    let (connection, _outbound, _token_box) = wire_up();

    let handle = connection.callbacks().intern("onTotalChanged");
    assert_eq!(connection.callbacks().len(), 1);

    drop(handle);
    tokio::task::yield_now().await;
}
