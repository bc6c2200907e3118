use diesel::prelude::*;
use serde::Serialize;

use crate::app::{AppError, DbConnection};
use crate::auth::password;
use crate::schema::users;

#[derive(Debug, Queryable, Clone, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    ///Argon2 hash string, never the raw password
    #[serde(skip_serializing)]
    pub password: String,
    pub profile_image: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct UserInsert<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    profile_image: Option<&'a str>,
}

impl User {
    /// Registers a new account and returns it.
    ///
    /// Username and email must both be free; the lookup is an exact,
    /// case-sensitive string match, and the UNIQUE constraints on the table
    /// back it up. The raw password is hashed before anything touches the
    /// database.
    ///
    /// # Example
    /// ```
    /// let user = User::create(&mut conn, "alice", "a@x.com", "secret1", None)?;
    /// ```
    pub fn create(
        conn: &mut DbConnection,
        uname: &str,
        email_in: &str,
        raw_password: &str,
        profile_image_in: Option<&str>,
    ) -> Result<User, AppError> {
        let taken = users::table
            .filter(users::username.eq(uname).or(users::email.eq(email_in)))
            .first::<User>(conn)
            .optional()?;
        if taken.is_some() {
            return Err(AppError::DuplicateIdentity);
        }

        let hashed = password::hash(raw_password)?;
        let to_insert = UserInsert {
            username: uname,
            email: email_in,
            password: &hashed,
            profile_image: profile_image_in,
        };

        let ret_user: User = diesel::insert_into(users::table)
            .values(&to_insert)
            .get_result(conn)?;

        Ok(ret_user)
    }

    /// Verifies login credentials.
    ///
    /// Looks the account up by email and checks the password against the
    /// stored hash. An unknown email and a wrong password fail with the
    /// same error, so the response never reveals whether the account
    /// exists.
    pub fn authenticate(
        conn: &mut DbConnection,
        email_in: &str,
        raw_password: &str,
    ) -> Result<User, AppError> {
        let user = users::table
            .filter(users::email.eq(email_in))
            .first::<User>(conn)
            .optional()?
            .ok_or(AppError::InvalidCredentials)?;

        if !password::verify(raw_password, &user.password) {
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    /** Returns the user with the id specified */
    pub fn find_by_id(conn: &mut DbConnection, user_id: i32) -> Result<User, AppError> {
        Ok(users::table.find(user_id).first::<User>(conn)?)
    }
}
