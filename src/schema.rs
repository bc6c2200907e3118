diesel::table! {
    users (id) {
        id -> Integer,
        username -> Text,
        email -> Text,
        password -> Text,
        profile_image -> Nullable<Text>,
    }
}

diesel::table! {
    blogs (id) {
        id -> Integer,
        title -> Text,
        body -> Text,
        image -> Nullable<Text>,
        created_by -> Integer,
        created_at -> Timestamp,
        views -> Integer,
        likes -> Integer,
    }
}

diesel::table! {
    comments (id) {
        id -> Integer,
        body -> Text,
        created_at -> Timestamp,
        user_id -> Integer,
        blog_id -> Integer,
    }
}

diesel::joinable!(blogs -> users (created_by));
diesel::joinable!(comments -> users (user_id));
diesel::joinable!(comments -> blogs (blog_id));

diesel::allow_tables_to_appear_in_same_query!(blogs, comments, users,);
