//! Query shapes shared across integration tests

use querycache::query::QueryExpr;
use querycache::{col, func, lit, param, qualified_col, source, Query};

/// `Orders WHERE CustomerId = @customerId`
pub fn orders_for_customer(customer_id: i64) -> Query {
    Query::new(source("Orders").filter(col("CustomerId").eq(param("customerId"))))
        .bind("customerId", customer_id)
}

/// `Orders o JOIN Customers c ON o.CustomerId = c.Id`
pub fn orders_with_customers() -> Query {
    Query::new(
        source("Orders").alias("o").inner_join(
            source("Customers").alias("c"),
            qualified_col("o", "CustomerId").eq(qualified_col("c", "Id")),
        ),
    )
}

/// Products priced above `@minPrice`, newest first, at most `@take` rows
pub fn expensive_products(min_price: f64, take: i64) -> Query {
    Query::new(
        source("Products")
            .filter(col("Price").gt(param("minPrice")))
            .order_by(col("CreatedAt"), true)
            .take(param("take")),
    )
    .bind("minPrice", min_price)
    .bind("take", take)
}

/// Ten structurally different query shapes over a handful of tables
pub fn shapes() -> Vec<Query> {
    let shapes: Vec<QueryExpr> = vec![
        source("Orders"),
        source("Customers"),
        source("Orders").filter(col("Total").gt(lit(100))),
        source("Orders").filter(col("CustomerId").eq(param("customerId"))),
        source("Customers").filter(func("lower", vec![col("Name")]).like(lit("a%"))),
        source("Orders").distinct(),
        source("Products").take(lit(5)),
        source("Orders")
            .alias("o")
            .inner_join(
                source("Customers").alias("c"),
                qualified_col("o", "CustomerId").eq(qualified_col("c", "Id")),
            ),
        source("Customers").filter(col("Id").in_subquery(
            source("Orders").project(vec![col("CustomerId")]),
        )),
        source("Orders").union(source("ArchivedOrders")),
    ];

    shapes
        .into_iter()
        .map(|expr| Query::new(expr).bind("customerId", 7))
        .collect()
}
