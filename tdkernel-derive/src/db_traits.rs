use darling::FromMeta;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

use crate::find_meta_attrs;

#[derive(Debug, FromMeta)]
struct BinaryValueArgs {
    #[darling(default)]
    codec: Option<String>,
}

pub(crate) fn impl_binary_value(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let args = find_meta_attrs("binary_value", &input.attrs)
        .map(|meta| {
            BinaryValueArgs::from_nested_meta(&meta)
                .unwrap_or_else(|e| panic!("invalid `binary_value` attribute: {}", e))
        })
        .unwrap_or(BinaryValueArgs { codec: None });

    let codec = args.codec.as_deref().unwrap_or("bincode");
    let body: TokenStream2 = match codec {
        "bincode" => quote! {
            impl #impl_generics tdkernel::BinaryValue for #name #ty_generics #where_clause {
                fn to_bytes(&self) -> Vec<u8> {
                    bincode::serialize(self).expect("`BinaryValue` serialization failed")
                }

                fn from_bytes(
                    bytes: std::borrow::Cow<'_, [u8]>,
                ) -> Result<Self, tdkernel::Error> {
                    bincode::deserialize(&bytes).map_err(|e| {
                        tdkernel::Error::type_mismatch(format!(
                            "failed to decode `{}`: {}",
                            stringify!(#name),
                            e
                        ))
                    })
                }
            }
        },
        other => panic!("unsupported `binary_value` codec: {}", other),
    };

    body.into()
}
