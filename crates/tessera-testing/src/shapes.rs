//! Test document shapes and the users built from them.

use serde::{Deserialize, Serialize};

use tessera_domain::{IdentityShapes, Role, RoleClaim, User, UserClaim, UserLogin, UserToken};

/// Application field stored inline on test users.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestProfile {
    pub custom_data: Option<String>,
}

/// String-keyed shapes with a [`TestProfile`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestShapes;

impl IdentityShapes for TestShapes {
    type Key = String;
    type Profile = TestProfile;
    type UserClaim = UserClaim<String>;
    type UserLogin = UserLogin<String>;
    type UserToken = UserToken<String>;
    type RoleClaim = RoleClaim<String>;
}

/// Integer-keyed shapes with a [`TestProfile`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestIntShapes;

impl IdentityShapes for TestIntShapes {
    type Key = i32;
    type Profile = TestProfile;
    type UserClaim = UserClaim<i32>;
    type UserLogin = UserLogin<i32>;
    type UserToken = UserToken<i32>;
    type RoleClaim = RoleClaim<i32>;
}

pub type TestUser = User<TestShapes>;
pub type TestUserInt = User<TestIntShapes>;
pub type TestRole = Role<TestShapes>;

fn numbered<S>(id: S::Key, n: u8) -> User<S>
where
    S: IdentityShapes<Profile = TestProfile>,
{
    User {
        id,
        user_name: Some(format!("User Name{n}")),
        normalized_user_name: Some(format!("USER NAME{n}")),
        email: Some(format!("test{n}@testing.com")),
        normalized_email: Some(format!("TEST{n}@TESTING.COM")),
        profile: TestProfile {
            custom_data: Some(format!("Some Info {n}")),
        },
        ..Default::default()
    }
}

pub mod test_user {
    use super::*;

    pub fn first() -> TestUser {
        numbered("a1".to_owned(), 1)
    }

    pub fn second() -> TestUser {
        numbered("b2".to_owned(), 2)
    }

    pub fn third() -> TestUser {
        numbered("c3".to_owned(), 3)
    }
}

pub mod test_user_int {
    use super::*;

    pub fn first() -> TestUserInt {
        numbered(1000, 1)
    }

    pub fn second() -> TestUserInt {
        numbered(2000, 2)
    }

    pub fn third() -> TestUserInt {
        numbered(3000, 3)
    }
}
