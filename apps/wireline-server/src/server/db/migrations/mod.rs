pub(crate) mod v1_identity_schema;
pub(crate) mod v2_social_graph_schema;
pub(crate) mod v3_message_schema;
