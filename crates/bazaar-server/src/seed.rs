//! Demo catalogue for `--seed`.

use bazaar_core::{
  ErrorKind,
  catalog::{NewOrder, NewOrderItem, NewVariant},
  store::{CommerceStore, StoreError as _},
};

const CUSTOMERS: &[(&str, &str)] = &[
  ("Budi Santoso", "Jl. Merdeka 10, Bandung"),
  ("Siti Rahma", "Jl. Sudirman 5, Jakarta"),
  ("Agus Wijaya", "Jl. Pemuda 21, Surabaya"),
];

/// `(name, price, [(size, color, stock)])`; variants are numbered in order
/// across all products.
const PRODUCTS: &[(&str, i64, &[(&str, &str, u32)])] = &[
  ("Kaos Polos", 75_000, &[("M", "White", 20), ("L", "White", 12), ("L", "Black", 3)]),
  ("Kemeja Flanel", 185_000, &[("M", "Red", 6), ("XL", "Blue", 1)]),
  ("Celana Chino", 240_000, &[("32", "Khaki", 8)]),
];

/// `(customer index, payment method, [(variant index, quantity)])`
pub const DEMO_ORDERS: &[(usize, &str, &[(usize, u32)])] = &[
  (0, "bank_transfer", &[(0, 2), (3, 1)]),
  (1, "ewallet", &[(2, 3)]),
  (2, "cod", &[(4, 2), (5, 1)]),
  (0, "ewallet", &[(1, 1)]),
];

/// Insert the demo catalogue and orders unless the store already holds
/// orders. Returns whether anything was written.
pub async fn demo<S: CommerceStore>(store: &S) -> Result<bool, S::Error> {
  match store.list_orders(1, 1).await {
    Ok(_) => {
      tracing::info!("store already has orders; skipping seed");
      return Ok(false);
    }
    Err(e) if e.kind() == ErrorKind::NotFound => {}
    Err(e) => return Err(e),
  }

  let mut customers = Vec::with_capacity(CUSTOMERS.len());
  for (name, address) in CUSTOMERS {
    let c = store.add_customer(name.to_string(), address.to_string()).await?;
    customers.push(c.customer_id);
  }

  let mut variants = Vec::new();
  for (name, price, sizes) in PRODUCTS {
    let product = store.add_product(name.to_string(), *price).await?;
    for (size, color, stock) in *sizes {
      let v = store
        .add_variant(NewVariant {
          product_id: product.product_id,
          size:       size.to_string(),
          color:      color.to_string(),
          stock:      *stock,
        })
        .await?;
      variants.push(v.variant_id);
    }
  }

  for (customer, payment_method, lines) in DEMO_ORDERS {
    store
      .place_order(NewOrder {
        customer_id:    customers[*customer],
        payment_method: payment_method.to_string(),
        items:          lines
          .iter()
          .map(|&(variant, quantity)| NewOrderItem { variant_id: variants[variant], quantity })
          .collect(),
      })
      .await?;
  }

  tracing::info!(
    customers = customers.len(),
    variants = variants.len(),
    orders = DEMO_ORDERS.len(),
    "seeded demo data"
  );
  Ok(true)
}
