//! Esquema Diesel. Reemplazable con `diesel print-schema`.

diesel::table! {
    step_states (instance, step_id) {
        instance -> Text,
        step_id -> Text,
        status -> Text,
        version -> Text,
        started_at -> Nullable<Timestamptz>,
        ended_at -> Nullable<Timestamptz>,
        counter -> Int4,
        error -> Nullable<Text>,
    }
}

diesel::table! {
    provision_events (seq) {
        seq -> BigInt,
        run_id -> Uuid,
        ts -> Timestamptz,
        event_type -> Text,
        payload -> Jsonb,
        error_class -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(step_states, provision_events,);
