//! Declarative [`Reflect`](crate::Reflect) implementations.

/// Implements [`Reflect`](crate::Reflect) for a struct whose listed fields
/// map one-to-one onto remote members. Fields left out of the list are not
/// serialized.
///
/// Field types must implement `Clone`, `Into<Value>` and
/// [`FromValue`](crate::FromValue).
///
/// ```
/// use amfwire_core::{reflect_type, Reflect};
///
/// #[derive(Debug, Default)]
/// struct Customer {
///     id: i32,
///     name: String,
///     session: Option<String>,
/// }
///
/// reflect_type!(Customer, "crm.Customer", extends ["crm.Entity"], [id: i32, name: String]);
///
/// let customer = Customer::default();
/// assert_eq!(customer.class_name(), "crm.Customer");
/// assert_eq!(customer.members().len(), 2);
/// ```
#[macro_export]
macro_rules! reflect_type {
    ($ty:ty, $class:expr, [$($field:ident : $fty:ty),* $(,)?]) => {
        $crate::reflect_type!($ty, $class, extends [], [$($field : $fty),*]);
    };
    ($ty:ty, $class:expr, extends [$($base:expr),* $(,)?], [$($field:ident : $fty:ty),* $(,)?]) => {
        impl $crate::Reflect for $ty {
            fn class_name(&self) -> &str {
                $class
            }

            fn ancestors(&self) -> &'static [&'static str] {
                &[$($base),*]
            }

            fn members(&self) -> ::std::vec::Vec<$crate::MemberInfo> {
                ::std::vec![$($crate::MemberInfo::new(stringify!($field))),*]
            }

            fn get_member(&self, name: &str) -> ::std::option::Option<$crate::Value> {
                match name {
                    $(stringify!($field) => ::std::option::Option::Some(
                        $crate::Value::from(::std::clone::Clone::clone(&self.$field)),
                    ),)*
                    _ => ::std::option::Option::None,
                }
            }

            fn set_member(
                &mut self,
                name: &str,
                value: $crate::Value,
            ) -> ::std::result::Result<(), $crate::CoreError> {
                match name {
                    $(stringify!($field) => {
                        self.$field = <$fty as $crate::FromValue>::from_value(value).map_err(|e| {
                            $crate::CoreError::InvalidMemberValue {
                                class: ::std::string::ToString::to_string($class),
                                member: ::std::string::ToString::to_string(name),
                                reason: ::std::string::ToString::to_string(&e),
                            }
                        })?;
                        ::std::result::Result::Ok(())
                    })*
                    _ => {
                        let _ = value;
                        ::std::result::Result::Err($crate::CoreError::MemberNotFound {
                            class: ::std::string::ToString::to_string($class),
                            member: ::std::string::ToString::to_string(name),
                        })
                    }
                }
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{CoreError, Reflect, Value};

    #[derive(Debug, Default, Clone)]
    struct Product {
        sku: String,
        price: f64,
        stock: Option<i32>,
        tags: Vec<String>,
        scratch: u8,
    }

    reflect_type!(Product, "shop.Product", [sku: String, price: f64, stock: Option<i32>, tags: Vec<String>]);

    #[derive(Debug, Default)]
    struct Empty;

    reflect_type!(Empty, "shop.Empty", []);

    #[test]
    fn test_members_follow_declaration_order() {
        let product = Product::default();
        let names: Vec<String> = product.members().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["sku", "price", "stock", "tags"]);
        assert!(product.ancestors().is_empty());
        assert_eq!(product.scratch, 0);
    }

    #[test]
    fn test_get_and_set_members() {
        let mut product = Product::default();
        product.set_member("sku", Value::string("A-1")).unwrap();
        product.set_member("price", Value::Integer(3)).unwrap();
        product.set_member("stock", Value::Null).unwrap();
        product
            .set_member("tags", Value::from(vec!["new", "sale"]))
            .unwrap();

        assert_eq!(product.sku, "A-1");
        assert_eq!(product.price, 3.0);
        assert_eq!(product.stock, None);
        assert_eq!(product.tags, vec!["new".to_string(), "sale".to_string()]);
        assert_eq!(product.get_member("price"), Some(Value::Number(3.0)));
        assert_eq!(product.get_member("scratch"), None);
    }

    #[test]
    fn test_set_member_errors() {
        let mut product = Product::default();
        let err = product.set_member("price", Value::string("free")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidMemberValue { .. }));

        let err = product.set_member("scratch", Value::Integer(1)).unwrap_err();
        assert!(err.is_member_not_found());
    }

    #[test]
    fn test_empty_type() {
        let mut empty = Empty;
        assert!(empty.members().is_empty());
        assert_eq!(empty.get_member("x"), None);
        assert!(empty.set_member("x", Value::Null).is_err());
    }
}
