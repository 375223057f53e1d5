use proc_macro::TokenStream;
use quote::quote;
use syn::*;

macro_rules! error {
    ($($tt:tt)*) => {
        return Err(syn::Error::new(proc_macro::Span::call_site().into(), format!($($tt)*)))
    };
}

pub fn from_row(input: DeriveInput) -> Result<TokenStream> {
    let DeriveInput { attrs: _, vis: _, ident, generics, data } = input;
    let Data::Struct(data) = data else {
        error!("only struct are currently supported")
    };

    let body = match data.fields {
        Fields::Named(FieldsNamed { named, .. }) => {
            let fields = named
                .into_iter()
                .filter_map(|e|e.ident)
                .map(|id|(id.to_string(),id))
                .map(|(name,id)|quote! { #id: row.take(#name)?, });
            quote! { Self { #(#fields)* } }
        },
        Fields::Unnamed(_) => {
            error!("row columns are looked up by name, use struct with named fields")
        },
        Fields::Unit => quote! { Self },
    };

    let (g1, g2, g3) = generics.split_for_impl();

    Ok(quote! {
        impl #g1 ::tabwire::FromRow for #ident #g2 #g3 {
            #[allow(unused_mut, unused_variables)]
            fn from_row(mut row: ::tabwire::DataRow) -> Result<Self, ::tabwire::DecodeError> {
                Ok(#body)
            }
        }
    }.into())
}
