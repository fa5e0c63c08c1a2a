//! Diesel schema for board archival persistence.

diesel::table! {
    /// Board aggregate roots.
    boards (id) {
        /// Stable board identifier.
        id -> Uuid,
        /// Display name.
        #[max_length = 200]
        name -> Varchar,
        /// Optional description.
        description -> Nullable<Text>,
        /// Owning user.
        owner_id -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Whether the board lives in cold storage.
        is_archived -> Bool,
        /// When the board was archived.
        archived_at -> Nullable<Timestamptz>,
        /// Reason recorded at archival time.
        archival_reason -> Nullable<Text>,
    }
}

diesel::table! {
    /// Workflow states with store-assigned keys.
    states (id) {
        /// Serial surrogate key.
        id -> Int4,
        /// Owning board.
        board_id -> Uuid,
        /// Column name, unique per board.
        #[max_length = 100]
        name -> Varchar,
        /// Column rank, unique per board.
        sort_order -> Int4,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Tasks on a board.
    tasks (id) {
        /// Stable task identifier.
        id -> Uuid,
        /// Owning board.
        board_id -> Uuid,
        /// Task title.
        #[max_length = 500]
        title -> Varchar,
        /// Optional description.
        description -> Nullable<Text>,
        /// Workflow state.
        state_id -> Int4,
        /// Optional assignee.
        assignee_id -> Nullable<Uuid>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Optional due date.
        due_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Comments on tasks.
    comments (id) {
        /// Stable comment identifier.
        id -> Uuid,
        /// Task the comment belongs to.
        task_id -> Uuid,
        /// Comment author.
        author_id -> Uuid,
        /// Comment body.
        content -> Text,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Board memberships keyed by board and user.
    board_members (board_id, user_id) {
        /// Board the membership grants access to.
        board_id -> Uuid,
        /// Member user.
        user_id -> Uuid,
        /// Role on the board.
        #[max_length = 50]
        role -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Archive and dearchive job records.
    archival_jobs (id) {
        /// Job identifier.
        id -> Uuid,
        /// Target board.
        board_id -> Uuid,
        /// Requested operation.
        #[max_length = 20]
        job_type -> Varchar,
        /// Current status.
        #[max_length = 20]
        status -> Varchar,
        /// When the job was accepted.
        started_at -> Timestamptz,
        /// When the job reached a terminal status.
        completed_at -> Nullable<Timestamptz>,
        /// Snapshot blob written or consumed.
        blob_path -> Nullable<Text>,
        /// Failure description.
        error_message -> Nullable<Text>,
        /// Worker that processed the job.
        #[max_length = 255]
        processed_by -> Nullable<Varchar>,
        /// Free-form metadata.
        metadata -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(boards, states, tasks, comments, board_members);
