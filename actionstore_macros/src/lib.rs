mod shape;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Shape)]
// ============================================================================

/// Derives the record shape of a struct, or the enum kind of a unit enum.
///
/// For structs this implements `actionstore::HasShape` and
/// `actionstore::ShapeField`; each named field becomes a shape field whose
/// kind comes from its Rust type.
///
/// # Usage
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Shape)]
/// struct Todo {
///     #[shape(id)]
///     uuid: String,
///     #[shape(alias = "is-done")]
///     done: bool,
///     #[shape(skip)]
///     cached_label: String,
/// }
///
/// #[derive(Serialize, Deserialize, Shape)]
/// enum Priority { Low, High }
/// ```
///
/// Field attributes:
/// - `id`: marks the identifier field (otherwise a field named `id` or `_id`)
/// - `alias = "wire-name"`: external name used when encoding/decoding payloads
/// - `skip`: leaves the field out of the shape
#[proc_macro_derive(Shape, attributes(shape))]
pub fn derive_shape(input: TokenStream) -> TokenStream {
    shape::derive_shape(input)
}
