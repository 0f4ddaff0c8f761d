//! End-to-end coverage of `HttpDispatcher` that a single module's unit tests
//! can't see: session persistence surviving across calls, and the CSRF
//! guard actually blocking a call before the method body runs.

use std::sync::Arc;

use remotecore::dispatch::request::RawHttpCall;
use remotecore::dispatch::response::OutgoingBody;
use remotecore::registry::{MethodOptions, ParamDescriptor, ParamKind, RemoteMethodRegistry};
use remotecore::security::group::{SecurityGroupOptions, SecurityGroupRegistry};
use remotecore::session::store::InMemorySessionStore;
use remotecore::{Error, HttpDispatcher, TokenBox};
use serde_json::Value;

fn open_group_registry() -> (Arc<RemoteMethodRegistry>, Arc<SecurityGroupRegistry>) {
    let groups = Arc::new(SecurityGroupRegistry::new());
    let gid = groups.register(SecurityGroupOptions { dev_disable_security: true, ..Default::default() });
    let registry = Arc::new(RemoteMethodRegistry::new());

    registry.class("Carts", gid).method(
        "addItem",
        vec![ParamDescriptor { name: "item".into(), kind: ParamKind::String, variadic: false }],
        Some(MethodOptions { is_safe: false, ..Default::default() }),
        Arc::new(|ctx, mut args| Box::pin(async move {
            let item = args.pop().unwrap_or(Value::Null);
            ctx.with_session(|view| {
                let mut cart = view.get("cart").and_then(|v| v.as_array().cloned()).unwrap_or_default();
                cart.push(item);
                view.set("cart", Value::Array(cart.clone()));
                Value::Array(cart)
            })
        })),
    );

    (registry, groups)
}

fn protected_group_registry() -> (Arc<RemoteMethodRegistry>, Arc<SecurityGroupRegistry>) {
    let groups = Arc::new(SecurityGroupRegistry::new());
    let gid = groups.register(SecurityGroupOptions::default());
    let registry = Arc::new(RemoteMethodRegistry::new());

    registry.class("Accounts", gid).method(
        "deleteAccount",
        vec![],
        Some(MethodOptions { is_safe: false, ..Default::default() }),
        Arc::new(|_ctx, _args| Box::pin(async move { Ok(Value::Bool(true)) })),
    );

    (registry, groups)
}

#[tokio::test]
async fn a_session_field_written_in_one_call_is_visible_in_the_next() {
    let (registry, groups) = open_group_registry();
    let token_box = Arc::new(TokenBox::from_secret(b"a reasonably long shared secret").unwrap());
    let store = Arc::new(InMemorySessionStore::new());
    let dispatcher = HttpDispatcher::new(registry, groups, token_box, store);

    let first = dispatcher.dispatch(RawHttpCall {
        method_name: "addItem".into(),
        query: "item=apple".into(),
        ..RawHttpCall::default()
    }, None).await.unwrap();

    let session_id = first.session_committed.as_ref()
        .and_then(|s| s.id.clone())
        .expect("writing a session field should assign an id and commit");
    assert_eq!(first.session_committed.as_ref().unwrap().version, 1);

    let second = dispatcher.dispatch(RawHttpCall {
        method_name: "addItem".into(),
        query: "item=banana".into(),
        ..RawHttpCall::default()
    }, Some(&session_id)).await.unwrap();

    match second.body {
        OutgoingBody::Json(Value::Array(items)) => {
            assert_eq!(items, vec![Value::String("apple".into()), Value::String("banana".into())]);
        }
        other => panic!("expected a json array, got {other:?}"),
    }
    assert_eq!(second.session_committed.as_ref().unwrap().version, 2);
    assert_eq!(second.session_committed.as_ref().unwrap().id.as_deref(), Some(session_id.as_str()));
}

#[tokio::test]
async fn a_cross_origin_call_without_proof_is_denied_before_the_method_runs() {
    let (registry, groups) = protected_group_registry();
    let token_box = Arc::new(TokenBox::from_secret(b"a reasonably long shared secret").unwrap());
    let store = Arc::new(InMemorySessionStore::new());
    let dispatcher = HttpDispatcher::new(registry, groups, token_box, store);

    let mut call = RawHttpCall { method_name: "deleteAccount".into(), ..RawHttpCall::default() };
    call.security.method = "POST".into();
    call.security.origin = Some("https://evil.test".into());
    call.security.forced_complex = true;

    let err = dispatcher.dispatch(call, None).await.unwrap_err();
    assert!(matches!(err, Error::SecurityDenied { .. }));
}
