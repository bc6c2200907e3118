use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::app::{AppError, DbConnection};
use crate::schema::comments;

#[derive(Debug, Queryable, Clone, Serialize)]
pub struct Comment {
    pub id: i32,
    pub body: String,
    pub created_at: NaiveDateTime,
    pub user_id: i32,
    pub blog_id: i32,
}

#[derive(Insertable)]
#[diesel(table_name = comments)]
struct CommentInsert<'a> {
    body: &'a str,
    created_at: NaiveDateTime,
    user_id: i32,
    blog_id: i32,
}

impl Comment {
    /** Creates a comment on the blog specified. The caller has already
    checked that blog and author exist; the foreign keys back that up. */
    pub fn create(
        conn: &mut DbConnection,
        blog_id_in: i32,
        user_id_in: i32,
        body_in: &str,
    ) -> Result<Comment, AppError> {
        let record = CommentInsert {
            body: body_in,
            created_at: Utc::now().naive_utc(),
            user_id: user_id_in,
            blog_id: blog_id_in,
        };

        Ok(diesel::insert_into(comments::table)
            .values(&record)
            .get_result::<Comment>(conn)?)
    }

    /** Returns all comments posted on a blog, newest first */
    pub fn list_by_blog(conn: &mut DbConnection, blog_id_in: i32) -> Result<Vec<Comment>, AppError> {
        Ok(comments::table
            .filter(comments::blog_id.eq(blog_id_in))
            .order(comments::created_at.desc())
            .load::<Comment>(conn)?)
    }
}
