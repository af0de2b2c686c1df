use tokio_util::sync::CancellationToken;

use tessera_core::config::Config;
use tessera_domain::DefaultShapes;
use tessera_identity::{
    ContextOptions, IdentityBuilder, IdentityConfig, IdentityError, MemoryDocumentBackend,
    RoleStore, StoreVariant, UserStore,
};
use tessera_testing::shapes::{TestIntShapes, TestRole, TestShapes, test_user};

fn builder(options: ContextOptions) -> IdentityBuilder<MemoryDocumentBackend> {
    IdentityBuilder::new(MemoryDocumentBackend::new(), options)
}

#[tokio::test]
async fn should_resolve_user_and_role_stores_when_registered_with_roles() {
    let services = builder(ContextOptions::with_roles())
        .add_stores::<TestShapes>()
        .unwrap()
        .build();
    let scope = services.scope();

    let users = scope.user_store::<TestShapes>().unwrap();
    assert_eq!(users.variant(), StoreVariant::UserAndRole);
    assert!(users.into_with_roles().is_some());
    assert!(scope.role_store::<TestShapes>().is_ok());

    let descriptor = services.descriptor::<TestShapes>().unwrap();
    assert!(descriptor.roles);
    assert!(descriptor.shapes.ends_with("TestShapes"));
    assert_eq!(descriptor.key, "alloc::string::String");
}

#[tokio::test]
async fn should_resolve_user_only_store_without_role_store() {
    let services = builder(ContextOptions::users_only())
        .add_user_stores::<TestShapes>()
        .unwrap()
        .build();
    let scope = services.scope();

    let users = scope.user_store::<TestShapes>().unwrap();
    assert_eq!(users.variant(), StoreVariant::UserOnly);
    assert!(users.into_user_only().is_some());
    assert!(matches!(
        scope.role_store::<TestShapes>(),
        Err(IdentityError::Configuration(_))
    ));
}

#[test]
fn should_reject_role_registration_without_roles_collection() {
    let result = builder(ContextOptions::users_only()).add_stores::<TestIntShapes>();
    match result {
        Err(IdentityError::Configuration(message)) => {
            assert!(message.contains("TestIntShapes"), "{message}");
        }
        Err(other) => panic!("expected Configuration, got {other:?}"),
        Ok(_) => panic!("expected Configuration, got a builder"),
    }
}

#[test]
fn should_keep_first_registration_of_a_shapes_type() {
    let services = builder(ContextOptions::with_roles())
        .add_user_stores::<TestShapes>()
        .unwrap()
        .add_stores::<TestShapes>()
        .unwrap()
        .add_stores::<TestIntShapes>()
        .unwrap()
        .build();

    assert_eq!(
        services.variant::<TestShapes>(),
        Some(StoreVariant::UserOnly)
    );
    assert_eq!(
        services.variant::<TestIntShapes>(),
        Some(StoreVariant::UserAndRole)
    );
    assert_eq!(services.variant::<DefaultShapes>(), None);
}

#[test]
fn should_reject_unregistered_shapes_at_resolution() {
    let services = builder(ContextOptions::with_roles()).build();
    let scope = services.scope();

    assert!(matches!(
        scope.user_store::<TestShapes>(),
        Err(IdentityError::Configuration(_))
    ));
}

#[tokio::test]
async fn should_isolate_scopes_but_share_the_backend() {
    let services = builder(ContextOptions::with_roles())
        .add_stores::<TestShapes>()
        .unwrap()
        .build();

    let first = services.scope();
    let users = first
        .user_store::<TestShapes>()
        .unwrap()
        .into_with_roles()
        .unwrap();
    let roles = first.role_store::<TestShapes>().unwrap();
    let mut role = TestRole::new("rid1".to_owned(), "Role 1").unwrap();
    roles.create(&mut role).await.unwrap();
    let mut user = test_user::first();
    user.roles.push("rid1".to_owned());
    users.create(&mut user).await.unwrap();

    let second = services.scope();
    assert!(!std::sync::Arc::ptr_eq(first.context(), second.context()));
    let other = second
        .user_store::<TestShapes>()
        .unwrap()
        .into_with_roles()
        .unwrap();
    let found = other.find_by_id("a1").await.unwrap().unwrap();
    assert_eq!(found.roles, ["rid1"]);
}

#[tokio::test]
async fn should_apply_auto_save_setting_to_resolved_stores() {
    let services = builder(ContextOptions::users_only())
        .auto_save_changes(false)
        .add_user_stores::<TestShapes>()
        .unwrap()
        .build();
    let scope = services.scope();
    let users = scope
        .user_store::<TestShapes>()
        .unwrap()
        .into_user_only()
        .unwrap();
    assert!(!users.auto_save_changes());

    let mut user = test_user::first();
    users.create(&mut user).await.unwrap();
    assert!(scope.context().has_changes().await);
    assert_eq!(scope.context().save_changes().await.unwrap(), 1);
}

#[tokio::test]
async fn should_hand_scope_cancellation_to_stores() {
    let services = builder(ContextOptions::users_only())
        .add_user_stores::<TestShapes>()
        .unwrap()
        .build();
    let token = CancellationToken::new();
    let scope = services.scope_with_cancellation(token.clone());
    let users = scope
        .user_store::<TestShapes>()
        .unwrap()
        .into_user_only()
        .unwrap();
    token.cancel();

    assert!(matches!(
        users.find_by_id("a1").await,
        Err(IdentityError::Cancelled)
    ));
}

#[test]
fn should_build_user_only_context_from_config() {
    let config = IdentityConfig::try_from_iter([
        ("IDENTITY_ROLES_COLLECTION".to_owned(), String::new()),
        ("IDENTITY_AUTO_SAVE_CHANGES".to_owned(), "false".to_owned()),
    ])
    .unwrap();
    let builder = IdentityBuilder::from_config(MemoryDocumentBackend::new(), &config);

    assert!(matches!(
        builder.add_stores::<TestShapes>(),
        Err(IdentityError::Configuration(_))
    ));
}
