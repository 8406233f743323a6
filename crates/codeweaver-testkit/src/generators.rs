//! Proptest generators for property-based testing.

use proptest::prelude::*;

use codeweaver_core::{
    CollectionRef, DocumentRef, FieldValue, Payload, PermissionErrorContext, SetOptions,
    WriteOperationKind,
};

/// Generate a valid path segment.
pub fn segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9_-]{0,19}".prop_map(String::from)
}

/// Generate a collection reference, one or three segments deep.
pub fn collection_ref() -> impl Strategy<Value = CollectionRef> {
    prop_oneof![
        segment().prop_map(|c| vec![c]),
        (segment(), segment(), segment()).prop_map(|(a, b, c)| vec![a, b, c]),
    ]
    .prop_map(|segments| {
        CollectionRef::new(&segments.join("/")).expect("generated segments are valid")
    })
}

/// Generate a document reference inside some collection.
pub fn document_ref() -> impl Strategy<Value = DocumentRef> {
    (collection_ref(), segment())
        .prop_map(|(collection, id)| collection.doc(&id).expect("generated id is valid"))
}

/// Generate a field name.
pub fn field_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_]{0,15}".prop_map(String::from)
}

/// Generate a field value, nesting arrays and maps a few levels deep.
pub fn field_value() -> impl Strategy<Value = FieldValue> {
    let leaf = prop_oneof![
        Just(FieldValue::Null),
        any::<bool>().prop_map(FieldValue::Bool),
        any::<i64>().prop_map(FieldValue::Integer),
        (-1.0e9f64..1.0e9).prop_map(FieldValue::Double),
        "[ -~]{0,24}".prop_map(FieldValue::String),
        (0i64..=4_102_444_800_000).prop_map(FieldValue::Timestamp),
        Just(FieldValue::ServerTimestamp),
    ];

    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(FieldValue::Array),
            prop::collection::btree_map(field_name(), inner, 0..4)
                .prop_map(|map| FieldValue::Map(map.into_iter().collect())),
        ]
    })
}

/// Generate a payload with up to `max_fields` top-level fields.
pub fn payload(max_fields: usize) -> impl Strategy<Value = Payload> {
    prop::collection::btree_map(field_name(), field_value(), 0..=max_fields)
        .prop_map(|map| map.into_iter().collect())
}

/// Generate a WriteOperationKind.
pub fn operation_kind() -> impl Strategy<Value = WriteOperationKind> {
    prop_oneof![
        Just(WriteOperationKind::Create),
        Just(WriteOperationKind::Read),
        Just(WriteOperationKind::Update),
        Just(WriteOperationKind::Delete),
    ]
}

/// Generate SetOptions.
pub fn set_options() -> impl Strategy<Value = SetOptions> {
    prop_oneof![Just(SetOptions::Overwrite), Just(SetOptions::Merge)]
}

/// One write call as a caller would issue it.
#[derive(Debug, Clone)]
pub enum WriteParams {
    Create {
        collection: CollectionRef,
        data: Payload,
    },
    Set {
        doc: DocumentRef,
        data: Payload,
        options: SetOptions,
    },
    Update {
        doc: DocumentRef,
        data: Payload,
    },
    Delete {
        doc: DocumentRef,
    },
}

impl WriteParams {
    /// The operation label a rejection of this call carries.
    pub fn expected_operation(&self) -> WriteOperationKind {
        match self {
            WriteParams::Create { .. } => WriteOperationKind::Create,
            WriteParams::Set { options, .. } => options.operation_kind(),
            WriteParams::Update { .. } => WriteOperationKind::Update,
            WriteParams::Delete { .. } => WriteOperationKind::Delete,
        }
    }

    /// The path a rejection of this call carries.
    pub fn expected_path(&self) -> String {
        match self {
            WriteParams::Create { collection, .. } => collection.to_string(),
            WriteParams::Set { doc, .. }
            | WriteParams::Update { doc, .. }
            | WriteParams::Delete { doc } => doc.to_string(),
        }
    }

    /// The payload a rejection of this call carries.
    pub fn expected_payload(&self) -> Option<&Payload> {
        match self {
            WriteParams::Create { data, .. }
            | WriteParams::Set { data, .. }
            | WriteParams::Update { data, .. } => Some(data),
            WriteParams::Delete { .. } => None,
        }
    }
}

impl Arbitrary for WriteParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            (collection_ref(), payload(6))
                .prop_map(|(collection, data)| WriteParams::Create { collection, data }),
            (document_ref(), payload(6), set_options())
                .prop_map(|(doc, data, options)| WriteParams::Set { doc, data, options }),
            (document_ref(), payload(6)).prop_map(|(doc, data)| WriteParams::Update { doc, data }),
            document_ref().prop_map(|doc| WriteParams::Delete { doc }),
        ]
        .boxed()
    }
}

/// Build the error context a rejection of `params` produces.
pub fn context_from_params(params: &WriteParams) -> PermissionErrorContext {
    match params {
        WriteParams::Create { collection, data } => {
            PermissionErrorContext::create(collection, data.clone())
        }
        WriteParams::Set { doc, data, options } => {
            PermissionErrorContext::set(doc, data.clone(), *options)
        }
        WriteParams::Update { doc, data } => PermissionErrorContext::update(doc, data.clone()),
        WriteParams::Delete { doc } => PermissionErrorContext::delete(doc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeweaver_core::PermissionError;

    proptest! {
        #[test]
        fn test_context_carries_call_inputs(params: WriteParams) {
            let ctx = context_from_params(&params);

            prop_assert_eq!(ctx.resource_path(), params.expected_path());
            prop_assert_eq!(ctx.operation(), params.expected_operation());
            prop_assert_eq!(ctx.attempted_payload(), params.expected_payload());
        }

        #[test]
        fn test_message_names_path_and_operation(params: WriteParams) {
            let err = PermissionError::new(context_from_params(&params));

            prop_assert!(err.message().contains(&params.expected_path()));
            prop_assert!(err.message().contains(params.expected_operation().as_str()));
        }

        #[test]
        fn test_request_json_mirrors_context(params: WriteParams) {
            let err = PermissionError::new(context_from_params(&params));
            let json: serde_json::Value = serde_json::from_str(&err.request_json()).unwrap();

            let expected_path = params.expected_path();
            prop_assert_eq!(json["resourcePath"].as_str(), Some(expected_path.as_str()));
            prop_assert_eq!(json["operation"].as_str(), Some(params.expected_operation().as_str()));
        }

        #[test]
        fn test_generated_paths_parse_back(doc in document_ref()) {
            let reparsed = DocumentRef::new(&doc.to_string()).unwrap();
            prop_assert_eq!(reparsed, doc);
        }
    }
}
