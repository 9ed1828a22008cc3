// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use arrow::datatypes::Schema;

use crate::error::*;
use crate::predicate::Predicate;
use crate::spec::field_type_of;

/// Check every leaf of the tree against the read schema: the field must
/// exist, optionally sit at the predicate's field index, and its arrow type
/// must map to the predicate's field type.
pub fn validate_with_schema(
    schema: &Schema,
    predicate: &Predicate,
    validate_field_idx: bool,
) -> Result<()> {
    match predicate {
        Predicate::Leaf(leaf) => {
            let field_name = leaf.field().name();
            let schema_field_idx =
                schema
                    .index_of(field_name)
                    .map_err(|_| Error::Invalid {
                        message: format!("field {field_name} does not exist in schema"),
                    })?;
            if validate_field_idx && schema_field_idx != leaf.field().index() {
                return InvalidSnafu {
                    message: format!(
                        "field {field_name} has field idx {schema_field_idx} in input schema, mismatch field idx {} in predicate",
                        leaf.field().index()
                    ),
                }
                .fail();
            }
            let schema_type = schema.field(schema_field_idx).data_type();
            let mapped = field_type_of(schema_type).map_err(|_| Error::Invalid {
                message: format!("Invalid type {schema_type} for predicate"),
            })?;
            if mapped != leaf.field().field_type() {
                return InvalidSnafu {
                    message: format!(
                        "schema type {schema_type} mismatches predicate field type {}",
                        leaf.field().field_type()
                    ),
                }
                .fail();
            }
            Ok(())
        }
        Predicate::And(children) | Predicate::Or(children) => {
            for child in children {
                validate_with_schema(schema, child, validate_field_idx)?;
            }
            Ok(())
        }
    }
}
