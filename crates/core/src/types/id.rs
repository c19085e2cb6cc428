//! Newtype IDs for type-safe entity references.
//!
//! The commerce backend hands out opaque string identifiers (`cart_01H...`,
//! `variant_01H...`). Use the `define_id!` macro to create wrappers that
//! prevent accidentally passing a line item id where a variant id is expected.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `new()`, `try_new()` (rejects blank input), `as_str()`, `into_inner()`
/// - `Display`, `AsRef<str>`, `From<String>` and `From<&str>`
///
/// # Example
///
/// ```rust
/// # use dorsal_core::define_id;
/// define_id!(WishlistId);
/// define_id!(CouponId);
///
/// let wishlist = WishlistId::new("wl_123");
/// assert_eq!(wishlist.as_str(), "wl_123");
/// assert!(CouponId::try_new("   ").is_none());
///
/// // These are different types, so this won't compile:
/// // let _: CouponId = wishlist;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Create an ID, returning `None` for empty or whitespace-only input.
            #[must_use]
            pub fn try_new(id: &str) -> Option<Self> {
                let trimmed = id.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Self(trimmed.to_owned()))
                }
            }

            /// Get the underlying identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

// Identifiers issued by the commerce backend
define_id!(CartId);
define_id!(LineItemId);
define_id!(VariantId);
define_id!(ProductId);
define_id!(CollectionId);
define_id!(RegionId);
define_id!(ShippingOptionId);
define_id!(ShippingMethodId);
define_id!(PaymentSessionId);
define_id!(PaymentProviderId);
define_id!(OrderId);
