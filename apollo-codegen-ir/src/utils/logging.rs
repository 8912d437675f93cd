/// This macro is a wrapper around `tracing::trace!` and should not be confused with our snapshot
/// testing. Its goal is to add the necessary context to logging statements so that external tools
/// can show how key data structures (shapes, merged fields, model groups) are built for one
/// document.
///
/// There are two ways of creating a snapshot. The easiest is by passing the macro an identifier
/// for the value you'd like to take a snapshot of. This will tag the snapshot type with the type
/// name of the value, create data that is a JSON string using serde_json, and add the message
/// literal that you pass in. EX:
/// ```ignore
/// snapshot!(shapes, "computed shapes");
/// // Generates:
/// // trace!(snapshot = "alloc::vec::Vec<Shape>", data = "[ .. ]", "computed shapes");
/// ```
/// If you do not want to serialize the data, you can pass the name tag for the snapshot and data
/// in directly. Note that the data needs to implement the tracing crate's `Value` trait. EX:
/// ```ignore
/// snapshot!("IrModelGroup", model_group.to_string(), "built model group");
/// ```
macro_rules! snapshot {
    ($value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        tracing::trace!(
            snapshot = std::any::type_name_of_val(&$value),
            data = serde_json::to_string(&$value).unwrap_or_else(|error| format!(
                "could not serialize value for a snapshot with message \"{}\": {error}",
                $msg
            )),
            $msg
        );
    };
    ($name:literal, $value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        tracing::trace!(snapshot = $name, data = $value, $msg);
    };
}

pub(crate) use snapshot;
