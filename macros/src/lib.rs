//! Derive macros for the Tombola event-lottery architecture.
//!
//! This crate provides procedural macros to reduce boilerplate when defining
//! aggregate action enums and state structs.
//!
//! # Available Macros
//!
//! - `#[derive(Action)]` - Generates helpers for action enums (commands/events)
//! - `#[derive(State)]` - Generates version accessors for state structs
//!
//! # Example
//!
//! ```ignore
//! use tombola_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum EnrollmentAction {
//!     #[command]
//!     JoinWaitingList { entrant: Entrant },
//!
//!     #[event]
//!     EntrantJoined { entrant: Entrant },
//! }
//!
//! // Generated methods:
//! assert!(EnrollmentAction::JoinWaitingList { entrant }.is_command());
//! assert!(EnrollmentAction::EntrantJoined { entrant }.is_event());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, parse_macro_input};

/// Derive macro for Action enums.
///
/// Generates helper methods for action enums:
/// - `is_command()` - Returns true if this variant is a command
/// - `is_event()` - Returns true if this variant is an event
/// - `event_type()` - Returns the event type name for serialization
///
/// # Attributes
///
/// - `#[command]` - Mark a variant as a command (a request to change state)
/// - `#[event]` - Mark a variant as an event (a fact about what happened)
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-enum type
/// - A variant has both `#[command]` and `#[event]` attributes
#[proc_macro_derive(Action, attributes(command, event))]
#[allow(clippy::expect_used)] // Proc macro panics become compile errors, not runtime panics
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    // Collect variants marked as commands or events
    let mut command_variants = Vec::new();
    let mut event_variants = Vec::new();

    for variant in &data_enum.variants {
        let variant_name = &variant.ident;
        let is_command = has_attribute(&variant.attrs, "command");
        let is_event = has_attribute(&variant.attrs, "event");

        if is_command && is_event {
            return syn::Error::new_spanned(
                variant,
                "Variant cannot be both #[command] and #[event]",
            )
            .to_compile_error()
            .into();
        }

        if is_command {
            command_variants.push(variant_name);
        }

        if is_event {
            event_variants.push(variant_name);
        }
    }

    // Map variant names to their field shapes for pattern generation
    let variant_map: std::collections::HashMap<_, _> = data_enum
        .variants
        .iter()
        .map(|v| (&v.ident, &v.fields))
        .collect();

    let is_command_arms = command_variants.iter().map(|variant| {
        // SAFETY: collected from data_enum.variants above, so the variant exists
        let fields = variant_map.get(variant).expect("variant must exist in map");
        match fields {
            Fields::Named(_) => quote! { Self::#variant { .. } => true, },
            Fields::Unnamed(_) => quote! { Self::#variant(..) => true, },
            Fields::Unit => quote! { Self::#variant => true, },
        }
    });

    let is_event_arms = event_variants.iter().map(|variant| {
        // SAFETY: collected from data_enum.variants above, so the variant exists
        let fields = variant_map.get(variant).expect("variant must exist in map");
        match fields {
            Fields::Named(_) => quote! { Self::#variant { .. } => true, },
            Fields::Unnamed(_) => quote! { Self::#variant(..) => true, },
            Fields::Unit => quote! { Self::#variant => true, },
        }
    });

    let event_type_arms = event_variants.iter().map(|variant| {
        let type_name = format!("{variant}.v1");
        // SAFETY: collected from data_enum.variants above, so the variant exists
        let fields = variant_map.get(variant).expect("variant must exist in map");
        match fields {
            Fields::Named(_) => quote! { Self::#variant { .. } => #type_name, },
            Fields::Unnamed(_) => quote! { Self::#variant(..) => #type_name, },
            Fields::Unit => quote! { Self::#variant => #type_name, },
        }
    });

    let expanded = quote! {
        impl #name {
            /// Returns true if this action is a command
            #[must_use]
            pub const fn is_command(&self) -> bool {
                match self {
                    #(#is_command_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action is an event
            #[must_use]
            pub const fn is_event(&self) -> bool {
                match self {
                    #(#is_event_arms)*
                    _ => false,
                }
            }

            /// Returns the event type name for serialization
            ///
            /// Only events have type names. Commands return "unknown".
            #[must_use]
            pub const fn event_type(&self) -> &'static str {
                match self {
                    #(#event_type_arms)*
                    _ => "unknown",
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Derive macro for State structs.
///
/// Generates version accessors for the field marked `#[version]`, used by
/// the service layer as the expected version for optimistic-concurrency
/// saves.
///
/// # Attributes
///
/// - `#[version]` - Mark a field of type `Option<Version>` as the version
///   tracker
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if applied
/// to a non-struct type.
///
/// # Example
///
/// ```ignore
/// use tombola_macros::State;
/// use tombola_core::document::Version;
///
/// #[derive(State, Clone, Debug)]
/// struct EnrollmentState {
///     pub rosters: HashMap<EventId, EventRoster>,
///     #[version]
///     pub version: Option<Version>,
/// }
/// ```
#[proc_macro_derive(State, attributes(version))]
#[allow(clippy::expect_used)] // Proc macro panics become compile errors, not runtime panics
pub fn derive_state(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Struct(data_struct) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(State)] can only be used on structs")
            .to_compile_error()
            .into();
    };

    let version_field = data_struct
        .fields
        .iter()
        .find(|field| has_attribute(&field.attrs, "version"));

    let version_impl = if let Some(field) = version_field {
        // SAFETY: named struct fields always carry an ident
        let version_field_name = field.ident.as_ref().expect("struct field must have ident");
        quote! {
            impl #name {
                /// Get the snapshot version this state was loaded at
                #[must_use]
                pub const fn version(&self) -> Option<tombola_core::document::Version> {
                    self.#version_field_name
                }

                /// Record the snapshot version of this state
                pub fn set_version(&mut self, version: tombola_core::document::Version) {
                    self.#version_field_name = Some(version);
                }
            }
        }
    } else {
        quote! {}
    };

    TokenStream::from(version_impl)
}

/// Helper function to check if an attribute list contains a specific attribute.
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
