use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::app::{AppError, DbConnection};
use crate::schema::{blogs, comments};

use super::user::User;

#[derive(Debug, PartialEq, Eq, Queryable, Clone, Serialize, Deserialize)]
pub struct Blog {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub image: Option<String>,
    pub created_by: i32,
    pub created_at: NaiveDateTime,
    pub views: i32,
    pub likes: i32,
}

#[derive(Insertable)]
#[diesel(table_name = blogs)]
struct BlogInsert<'a> {
    title: &'a str,
    body: &'a str,
    image: Option<&'a str>,
    created_by: i32,
    created_at: NaiveDateTime,
    views: i32,
    likes: i32,
}

impl Blog {
    pub fn create(
        conn: &mut DbConnection,
        creator: &User,
        title_in: &str,
        body_in: &str,
        image_in: Option<&str>,
    ) -> Result<Blog, AppError> {
        let to_insert = BlogInsert {
            title: title_in,
            body: body_in,
            image: image_in,
            created_by: creator.id,
            created_at: Utc::now().naive_utc(),
            views: 0,
            likes: 0,
        };

        let ret_blog: Blog = diesel::insert_into(blogs::table)
            .values(&to_insert)
            .get_result(conn)?;

        Ok(ret_blog)
    }

    /** Returns every blog, newest first */
    pub fn list_all(conn: &mut DbConnection) -> Result<Vec<Blog>, AppError> {
        Ok(blogs::table
            .order(blogs::created_at.desc())
            .load::<Blog>(conn)?)
    }

    /** Returns the blogs created by one user, newest first */
    pub fn list_by_creator(conn: &mut DbConnection, creator: i32) -> Result<Vec<Blog>, AppError> {
        Ok(blogs::table
            .filter(blogs::created_by.eq(creator))
            .order(blogs::created_at.desc())
            .load::<Blog>(conn)?)
    }

    /// Case-sensitive substring match over title or body, newest first.
    /// Matching happens here rather than through SQL `LIKE`, which is
    /// case-insensitive on SQLite and would change the semantics. An empty
    /// or whitespace query returns everything, unfiltered.
    pub fn search(conn: &mut DbConnection, query: &str) -> Result<Vec<Blog>, AppError> {
        let all = Self::list_all(conn)?;

        let query = query.trim();
        if query.is_empty() {
            return Ok(all);
        }

        Ok(all
            .into_iter()
            .filter(|blog| blog.title.contains(query) || blog.body.contains(query))
            .collect())
    }

    pub fn get_by_id(conn: &mut DbConnection, blog_id: i32) -> Result<Blog, AppError> {
        Ok(blogs::table.find(blog_id).first::<Blog>(conn)?)
    }

    /// Counts a view and returns the blog as the visitor sees it. The
    /// increment is a single `UPDATE … SET views = views + 1`, so
    /// concurrent viewers cannot lose each other's counts. Every call
    /// counts, repeat visitors included.
    pub fn record_view(conn: &mut DbConnection, blog_id: i32) -> Result<Blog, AppError> {
        let updated = diesel::update(blogs::table.find(blog_id))
            .set(blogs::views.eq(blogs::views + 1))
            .execute(conn)?;
        if updated == 0 {
            return Err(AppError::NotFound);
        }

        Self::get_by_id(conn, blog_id)
    }

    /// Adds one like and returns the new count. There is no per-user
    /// bookkeeping: the same account liking again adds another one.
    pub fn add_like(conn: &mut DbConnection, blog_id: i32) -> Result<i32, AppError> {
        let updated = diesel::update(blogs::table.find(blog_id))
            .set(blogs::likes.eq(blogs::likes + 1))
            .execute(conn)?;
        if updated == 0 {
            return Err(AppError::NotFound);
        }

        Ok(blogs::table
            .find(blog_id)
            .select(blogs::likes)
            .first::<i32>(conn)?)
    }

    /// The single ownership check behind every mutating operation. Only the
    /// creator may edit or delete a blog.
    pub fn ensure_owned_by(&self, user: &User) -> Result<(), AppError> {
        if self.created_by != user.id {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    /// Overwrites title and body; the image is replaced only when a new
    /// valid upload was supplied.
    pub fn update(
        &self,
        conn: &mut DbConnection,
        title_in: &str,
        body_in: &str,
        image_in: Option<&str>,
    ) -> Result<Blog, AppError> {
        let target = blogs::table.find(self.id);

        let updated = match image_in {
            Some(image) => diesel::update(target)
                .set((
                    blogs::title.eq(title_in),
                    blogs::body.eq(body_in),
                    blogs::image.eq(image),
                ))
                .get_result::<Blog>(conn)?,
            None => diesel::update(target)
                .set((blogs::title.eq(title_in), blogs::body.eq(body_in)))
                .get_result::<Blog>(conn)?,
        };

        Ok(updated)
    }

    /// Removes the blog. Its comments go first so they never outlive the
    /// post they reference.
    pub fn delete(&self, conn: &mut DbConnection) -> Result<(), AppError> {
        diesel::delete(comments::table.filter(comments::blog_id.eq(self.id))).execute(conn)?;
        diesel::delete(blogs::table.find(self.id)).execute(conn)?;

        Ok(())
    }
}
