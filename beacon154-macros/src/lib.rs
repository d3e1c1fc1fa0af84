//! Procedural macros for fixed-layout IEEE 802.15.4 fields.
//!
//! `#[frame]` turns a struct whose fields describe a bit-packed wire layout
//! into a zero-copy reader/writer over `T: AsRef<[u8]>`. Field attributes:
//! - `#[bits(n)]`: the field occupies `n` bits of the current octet.
//! - `#[bytes(n)]`: the field occupies `n` octets (`0` means "the rest").
//! - `#[condition(expr)]`: the getter returns `Option`, `Some` when `expr`
//!   holds.
//!
//! Fields whose name contains `reserved` only advance the offset.
use proc_macro::TokenStream;
use quote::{format_ident, quote, ToTokens};
use syn::{parse_macro_input, Attribute, Fields, ItemStruct};

fn int_attr(attrs: &[Attribute], name: &str) -> syn::Result<Option<usize>> {
    for attr in attrs {
        if attr.path().is_ident(name) {
            let lit = attr.parse_args::<syn::LitInt>()?;
            return Ok(Some(lit.base10_parse::<usize>()?));
        }
    }
    Ok(None)
}

#[proc_macro_attribute]
pub fn frame(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    match expand(input) {
        Ok(tokens) => tokens.into_token_stream().into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: ItemStruct) -> syn::Result<impl ToTokens> {
    let item_attr = input.attrs;
    let vis = input.vis;
    let name = input.ident;

    let Fields::Named(fields) = input.fields else {
        return Err(syn::Error::new_spanned(
            name,
            "#[frame] requires a struct with named fields",
        ));
    };

    let mut getters = vec![];
    let mut setters = vec![];

    let mut offset = 0usize;
    let mut bits_offset = 0usize;

    for field in fields.named {
        let Some(fnname) = field.ident.clone() else {
            continue;
        };
        let ty = field.ty;
        let ty_name = ty.to_token_stream().to_string();

        let docs: Vec<_> = field
            .attrs
            .iter()
            .filter(|attr| attr.path().is_ident("doc"))
            .collect();

        let condition = field
            .attrs
            .iter()
            .find(|attr| attr.path().is_ident("condition"))
            .map(|attr| attr.parse_args::<syn::Expr>())
            .transpose()?;

        let bits = int_attr(&field.attrs, "bits")?;
        let bytes = match int_attr(&field.attrs, "bytes")? {
            Some(bytes) => Some(bytes),
            None => match ty_name.as_str() {
                "bool" | "u8" => Some(1),
                "u16" => Some(2),
                "u32" => Some(4),
                _ => None,
            },
        };

        if !fnname.to_string().contains("reserved") {
            let getter = match ty_name.as_str() {
                "bool" => quote! {
                    ((self.buffer.as_ref()[#offset] >> #bits_offset) & 0b1) != 0
                },
                "u8" => match bits {
                    Some(bits) => quote! {
                        (self.buffer.as_ref()[#offset] >> #bits_offset) & (((1u16 << #bits) - 1) as u8)
                    },
                    None => quote! { self.buffer.as_ref()[#offset] },
                },
                "u16" => quote! {
                    let b = &self.buffer.as_ref()[#offset..];
                    u16::from_le_bytes([b[0], b[1]])
                },
                "u32" => {
                    if bytes == Some(3) {
                        quote! {
                            let b = &self.buffer.as_ref()[#offset..];
                            u32::from_le_bytes([b[0], b[1], b[2], 0])
                        }
                    } else {
                        quote! {
                            let b = &self.buffer.as_ref()[#offset..];
                            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
                        }
                    }
                }
                "& [u8]" => match bytes {
                    Some(0) | None => quote! { &self.buffer.as_ref()[#offset..] },
                    Some(bytes) => quote! { &self.buffer.as_ref()[#offset..][..#bytes] },
                },
                _ => quote! {
                    #ty::new_unchecked(&self.buffer.as_ref()[#offset..][..#ty::<&[u8]>::size()])
                },
            };

            let return_type = match ty_name.as_str() {
                "bool" | "u8" | "u16" | "u32" | "& [u8]" => quote! { #ty },
                _ => quote! { #ty<&[u8]> },
            };

            if let Some(ref condition) = condition {
                getters.push(quote! {
                    #(#docs)*
                    pub fn #fnname(&self) -> Option<#return_type> {
                        if #condition {
                            Some({ #getter })
                        } else {
                            None
                        }
                    }
                });
            } else {
                getters.push(quote! {
                    #(#docs)*
                    pub fn #fnname(&self) -> #return_type {
                        #getter
                    }
                });

                let setter_name = format_ident!("set_{}", fnname);
                let doc = format!("Set the `{fnname}` field.");
                let setter = match ty_name.as_str() {
                    "bool" => Some(quote! {
                        let b = &mut self.buffer.as_mut()[#offset];
                        *b = (*b & !(1 << #bits_offset)) | ((value as u8) << #bits_offset);
                    }),
                    "u8" => match bits {
                        Some(bits) => Some(quote! {
                            let mask = ((((1u16 << #bits) - 1) << #bits_offset) & 0xff) as u8;
                            let b = &mut self.buffer.as_mut()[#offset];
                            *b = (*b & !mask) | ((value << #bits_offset) & mask);
                        }),
                        None => Some(quote! { self.buffer.as_mut()[#offset] = value; }),
                    },
                    "u16" => Some(quote! {
                        self.buffer.as_mut()[#offset..][..2].copy_from_slice(&value.to_le_bytes());
                    }),
                    "u32" => {
                        let len = bytes.unwrap_or(4);
                        Some(quote! {
                            self.buffer.as_mut()[#offset..][..#len]
                                .copy_from_slice(&value.to_le_bytes()[..#len]);
                        })
                    }
                    _ => None,
                };

                if let Some(setter) = setter {
                    setters.push(quote! {
                        #[doc = #doc]
                        pub fn #setter_name(&mut self, value: #ty) {
                            #setter
                        }
                    });
                }
            }
        }

        match (bits, bytes) {
            (Some(bits), _) => {
                bits_offset += bits;
                if bits_offset % 8 == 0 {
                    offset += bits_offset / 8;
                    bits_offset = 0;
                }
            }
            (None, Some(bytes)) => offset += bytes,
            (None, None) => {
                return Err(syn::Error::new_spanned(
                    fnname,
                    "field needs a #[bits(..)] or #[bytes(..)] attribute",
                ))
            }
        }
    }

    let name_str = name.to_string();
    let new_doc = format!("Create a new [`{name_str}`] reader/writer from a given buffer.\n\n# Errors\n\nReturns an error if the buffer is too short.");
    let unchecked_doc =
        format!("Create a new [`{name_str}`] reader/writer without length checking.");

    Ok(quote! {
        #(#item_attr)*
        #vis struct #name<T: AsRef<[u8]>> {
            buffer: T,
        }

        impl<T: AsRef<[u8]>> #name<T> {
            #[doc = #new_doc]
            pub fn new(buffer: T) -> Result<Self> {
                let s = Self::new_unchecked(buffer);

                if !s.check_len() {
                    return Err(Error);
                }

                Ok(s)
            }

            /// Returns `false` if the buffer is too short for this structure.
            pub fn check_len(&self) -> bool {
                self.buffer.as_ref().len() >= Self::size()
            }

            #[doc = #unchecked_doc]
            pub fn new_unchecked(buffer: T) -> Self {
                Self { buffer }
            }

            /// Returns the underlying buffer.
            pub fn into_inner(self) -> T {
                self.buffer
            }

            #(#getters)*

            /// Returns the size of this structure in bytes.
            pub const fn size() -> usize {
                #offset
            }
        }

        impl<T: AsRef<[u8]> + AsMut<[u8]>> #name<T> {
            #(#setters)*
        }
    })
}
