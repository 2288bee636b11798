use super::test_util::{create_user, prepare_db_and_test};
use crate::domain::DrivenPortError;
use crate::domain::auth::driving_ports::{AuthError, AuthPort};
use crate::domain::auth::{AuthService, Credentials, Registration};
use crate::domain::user::CreateUser;
use crate::domain::user::driven_ports::{UserReader, UserWriter};
use crate::persistence::ExternalConnectivity;
use crate::persistence::db_user_driven_ports::{DbReadUsers, DbWriteUsers};
use crate::security::{Argon2PasswordHasher, JwtSessionTokens};
use speculoos::prelude::*;

#[test]
fn duplicate_email_is_a_conflict_at_write_time() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        create_user(&mut ext_cxn, "jane@example.com").await;

        let second_insert = DbWriteUsers
            .create_user(
                &CreateUser {
                    name: "Other Jane".to_owned(),
                    email: "jane@example.com".to_owned(),
                    password_hash: "hash".to_owned(),
                },
                &mut ext_cxn,
            )
            .await;

        let Err(DrivenPortError::Conflict) = second_insert else {
            panic!("Expected a conflict, got {second_insert:?}");
        };
    });
}

#[test]
fn register_then_login() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let tokens = JwtSessionTokens::new("integration-secret", chrono::Duration::minutes(5));
        let registration = Registration {
            name: "Jane Doe".to_owned(),
            email: "jane@example.com".to_owned(),
            password: "password123".to_owned(),
        };

        let session = AuthService
            .register(
                &registration,
                &mut ext_cxn,
                &DbReadUsers,
                &DbWriteUsers,
                &Argon2PasswordHasher,
                &tokens,
            )
            .await
            .expect("registration should succeed");

        let second_registration = AuthService
            .register(
                &registration,
                &mut ext_cxn,
                &DbReadUsers,
                &DbWriteUsers,
                &Argon2PasswordHasher,
                &tokens,
            )
            .await;
        let Err(AuthError::EmailTaken) = second_registration else {
            panic!("Expected duplicate registration to fail");
        };

        let login_result = AuthService
            .login(
                &Credentials {
                    email: "jane@example.com".to_owned(),
                    password: "password123".to_owned(),
                },
                &mut ext_cxn,
                &DbReadUsers,
                &Argon2PasswordHasher,
                &tokens,
            )
            .await;
        assert_that!(login_result)
            .is_ok()
            .matches(|login_session| login_session.user.id == session.user.id);

        let bad_login = AuthService
            .login(
                &Credentials {
                    email: "jane@example.com".to_owned(),
                    password: "wrong-password".to_owned(),
                },
                &mut ext_cxn,
                &DbReadUsers,
                &Argon2PasswordHasher,
                &tokens,
            )
            .await;
        let Err(AuthError::InvalidCredentials) = bad_login else {
            panic!("Expected wrong password to be rejected");
        };
    });
}

#[test]
fn profile_updates_are_stored() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let user_id = create_user(&mut ext_cxn, "jane@example.com").await;

        DbWriteUsers
            .update_name(user_id, "Jane Smith", &mut ext_cxn)
            .await
            .expect("rename should succeed");
        DbWriteUsers
            .update_profile_image(user_id, "/uploads/profiles/me.png", &mut ext_cxn)
            .await
            .expect("image update should succeed");

        let stored_user = DbReadUsers
            .user_by_id(user_id, &mut ext_cxn)
            .await
            .expect("lookup should succeed");
        assert_that!(stored_user).is_some().matches(|user| {
            user.name == "Jane Smith"
                && user.profile_image.as_deref() == Some("/uploads/profiles/me.png")
                && user.updated_at >= user.created_at
        });
    });
}
