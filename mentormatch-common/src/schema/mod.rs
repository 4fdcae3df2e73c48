diesel::table! {
    matching_requests (id) {
        id -> Int4,
        mentee_id -> Int4,
        mentor_id -> Int4,
        message -> Text,
        status -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    users (id) {
        id -> Int4,
        email -> Text,
        password_hash -> Text,
        name -> Text,
        role -> Text,
        bio -> Nullable<Text>,
        image_data -> Nullable<Bytea>,
        image_type -> Nullable<Text>,
        skills -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(matching_requests, users);
