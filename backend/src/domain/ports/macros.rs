//! Helper macro generating port error enums.
//!
//! Each variant carries named fields and a display message; the macro adds a
//! snake_case constructor per variant whose parameters accept `impl Into<_>`.

macro_rules! define_port_error {
    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident { $($field:ident : $ty:ty),* $(,)? } => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant { $($field : $ty),* },
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    define_port_error! {
        pub enum StageFetchError {
            Unreachable { message: String } => "unreachable: {message}",
            Rejected { status: u16 } => "rejected with {status}",
            Partial { message: String, rows: u64 } => "{rows} rows failed: {message}",
        }
    }

    #[test]
    fn string_fields_accept_str() {
        let err = StageFetchError::unreachable("cms timed out");
        assert_eq!(err.to_string(), "unreachable: cms timed out");
    }

    #[test]
    fn non_string_fields_keep_their_type() {
        assert_eq!(StageFetchError::rejected(503_u16).to_string(), "rejected with 503");
    }

    #[test]
    fn constructor_parameters_follow_field_order() {
        let err = StageFetchError::partial("duplicate key", 2_u64);
        assert_eq!(err.to_string(), "2 rows failed: duplicate key");
    }
}
