use std::error::Error;

use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::types::RowValues;

/// Writes each value in the width the server asked for: an `Int` bound to an `int4` parameter
/// is sent as four bytes, a `Float` bound to `float4` as an `f32`. A value whose kind does not
/// fit the parameter type is refused instead of being sent in the wrong binary format.
impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            RowValues::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::INT8 => i.to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Text(s) if is_text(ty) => s.to_sql(ty, out),
            RowValues::Bool(b) if *ty == Type::BOOL => b.to_sql(ty, out),
            RowValues::Timestamp(dt) => match *ty {
                Type::TIMESTAMP => dt.to_sql(ty, out),
                Type::TIMESTAMPTZ => dt.and_utc().to_sql(ty, out),
                Type::DATE => dt.date().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::JSON(json) if matches!(*ty, Type::JSON | Type::JSONB) => {
                json.to_sql(ty, out)
            }
            RowValues::Blob(bytes) if *ty == Type::BYTEA => bytes.to_sql(ty, out),
            _ => Err(mismatch(self, ty)),
        }
    }

    fn accepts(ty: &Type) -> bool {
        is_text(ty)
            || matches!(
                *ty,
                Type::INT2
                    | Type::INT4
                    | Type::INT8
                    | Type::FLOAT4
                    | Type::FLOAT8
                    | Type::BOOL
                    | Type::TIMESTAMP
                    | Type::TIMESTAMPTZ
                    | Type::DATE
                    | Type::JSON
                    | Type::JSONB
                    | Type::BYTEA
            )
    }

    to_sql_checked!();
}

fn is_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

fn mismatch(value: &RowValues, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("cannot bind {value} as {ty}").into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &RowValues, ty: &Type) -> Vec<u8> {
        let mut out = bytes::BytesMut::new();
        value.to_sql_checked(ty, &mut out).unwrap();
        out.to_vec()
    }

    #[test]
    fn ints_follow_parameter_width() {
        assert_eq!(encode(&RowValues::Int(7), &Type::INT2), vec![0, 7]);
        assert_eq!(encode(&RowValues::Int(7), &Type::INT4), vec![0, 0, 0, 7]);
        assert_eq!(encode(&RowValues::Int(7), &Type::INT8).len(), 8);
        let mut out = bytes::BytesMut::new();
        assert!(RowValues::Int(70_000).to_sql_checked(&Type::INT2, &mut out).is_err());
    }

    #[test]
    fn floats_and_nulls() {
        assert_eq!(encode(&RowValues::Float(1.5), &Type::FLOAT4).len(), 4);
        assert_eq!(encode(&RowValues::Float(1.5), &Type::FLOAT8).len(), 8);
        let mut out = bytes::BytesMut::new();
        assert!(matches!(
            RowValues::Null.to_sql_checked(&Type::INT4, &mut out),
            Ok(IsNull::Yes)
        ));
        assert!(!<RowValues as ToSql>::accepts(&Type::NUMERIC));
    }

    #[test]
    fn values_of_the_wrong_kind_are_refused() {
        let mut out = bytes::BytesMut::new();
        let err = RowValues::Text("12345678".into())
            .to_sql_checked(&Type::INT8, &mut out)
            .err()
            .expect("expected an error");
        assert!(err.to_string().contains("int8"), "{err}");
        assert!(RowValues::Int(1).to_sql_checked(&Type::TEXT, &mut out).is_err());
        assert!(RowValues::Bool(true).to_sql_checked(&Type::INT4, &mut out).is_err());
        assert!(RowValues::Float(1.0).to_sql_checked(&Type::INT8, &mut out).is_err());
        assert!(RowValues::Blob(vec![1]).to_sql_checked(&Type::TEXT, &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn matching_kinds_encode() {
        assert_eq!(encode(&RowValues::Text("ab".into()), &Type::VARCHAR), b"ab".to_vec());
        assert_eq!(encode(&RowValues::Int(2), &Type::FLOAT8).len(), 8);
        assert_eq!(encode(&RowValues::Bool(true), &Type::BOOL), vec![1]);
        assert_eq!(encode(&RowValues::Blob(vec![9, 8]), &Type::BYTEA), vec![9, 8]);
    }
}
