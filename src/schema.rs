diesel::table! {
    users (id) {
        id -> Integer,
        email -> Text,
        username -> Text,
        password -> Text,
        role -> Text,
    }
}

diesel::table! {
    superadmin_details (id) {
        id -> Integer,
        user_id -> Integer,
        custom_id -> Text,
        full_name -> Text,
        mobile_number -> Nullable<Text>,
        image_path -> Nullable<Text>,
    }
}

diesel::table! {
    admin_details (id) {
        id -> Integer,
        user_id -> Integer,
        custom_id -> Text,
        full_name -> Text,
        mobile_number -> Nullable<Text>,
        image_path -> Nullable<Text>,
    }
}

diesel::table! {
    student_details (id) {
        id -> Integer,
        user_id -> Integer,
        custom_id -> Text,
        full_name -> Text,
        mobile_number -> Nullable<Text>,
        image_path -> Nullable<Text>,
    }
}

diesel::table! {
    id_counters (role_tag) {
        role_tag -> Text,
        next_value -> Integer,
    }
}

diesel::table! {
    categories (id) {
        id -> Integer,
        name -> Text,
    }
}

diesel::table! {
    mainstreams (id) {
        id -> Integer,
        name -> Text,
    }
}

diesel::table! {
    substreams (id) {
        id -> Integer,
        name -> Text,
    }
}

diesel::table! {
    courses (id) {
        id -> Integer,
        course_name -> Text,
        category_id -> Nullable<Integer>,
        description -> Nullable<Text>,
        requirements -> Nullable<Text>,
        overview -> Nullable<Text>,
        pricing_type -> Text,
        price_amount -> Integer,
        course_image -> Nullable<Text>,
        course_video -> Nullable<Text>,
        is_active -> Bool,
        created_by -> Nullable<Text>,
        course_unique_code -> Text,
        nm_approval_status -> Text,
        status -> Text,
        nm_reference_id -> Nullable<Text>,
        nm_last_sync -> Nullable<Timestamp>,
        course_content -> Nullable<Text>,
    }
}

diesel::table! {
    modules (id) {
        id -> Integer,
        course_id -> Integer,
        module_name -> Text,
        order_index -> Integer,
    }
}

diesel::table! {
    chapters (id) {
        id -> Integer,
        module_id -> Integer,
        chapter_name -> Text,
        materials_json -> Text,
        order_index -> Integer,
    }
}

diesel::table! {
    enrollments (id) {
        id -> Integer,
        custom_id -> Text,
        course_id -> Integer,
        enrolled_at -> Timestamp,
        completion_deadline -> Timestamp,
        completed -> Bool,
    }
}

diesel::table! {
    progress (id) {
        id -> Integer,
        custom_id -> Text,
        course_id -> Integer,
        module_id -> Integer,
        chapter_id -> Integer,
        progress_percent -> Integer,
        last_visited_at -> Timestamp,
    }
}

diesel::table! {
    rewards (id) {
        id -> Integer,
        custom_id -> Text,
        course_id -> Integer,
        reward_name -> Text,
        reward_points -> Integer,
        achieved_percent -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    certificates (id) {
        id -> Integer,
        user_email -> Text,
        course_id -> Integer,
        certificate_url -> Text,
        issued_at -> Timestamp,
    }
}
