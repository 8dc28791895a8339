//! Checkout: validate the shipping/payment form, take a simulated payment and
//! drain the cart.
//!
//! No payment gateway is contacted. Draining either clears the cart in one
//! call ([`DrainStrategy::Bulk`]) or removes it one unit at a time
//! ([`DrainStrategy::PerUnit`]). A failed call ends the checkout in
//! [`CheckoutState::Error`] and leaves whatever was not yet removed in the
//! cart; nothing is rolled back.

use thiserror::Error;

use super::{CartApi, ClientError};
use crate::models::{cart_quantity, CartMap, Product};

pub const TAX_RATE: f64 = 0.08;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentMethod {
    #[default]
    Card,
    PayPal,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
    pub card_name: String,
}

impl CheckoutForm {
    /// Names of required fields left blank. Cards need the card details on
    /// top of the shipping address.
    pub fn missing_fields(&self, method: PaymentMethod) -> Vec<&'static str> {
        let mut required = vec![
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
            ("address", &self.address),
            ("city", &self.city),
            ("zipCode", &self.zip_code),
        ];
        if method == PaymentMethod::Card {
            required.extend([
                ("cardNumber", &self.card_number),
                ("expiry", &self.expiry),
                ("cvv", &self.cvv),
                ("cardName", &self.card_name),
            ]);
        }

        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    CollectingInput,
    Validating,
    Processing,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainStrategy {
    /// One removal call per unit, as the original storefront did.
    PerUnit,
    #[default]
    Bulk,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,

    #[error("please fill in all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("there was an error processing your payment after {calls_completed} cart updates")]
    Drain {
        calls_completed: usize,
        #[source]
        source: ClientError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Cart calls issued to empty the cart.
    pub calls: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub product_id: i64,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i64,
    pub line_total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub lines: Vec<OrderLine>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

impl OrderSummary {
    /// Shipping is free; tax is a flat rate on the subtotal.
    pub fn new(products: &[Product], cart: &CartMap) -> Self {
        let lines: Vec<OrderLine> = products
            .iter()
            .filter_map(|product| {
                let quantity = cart_quantity(cart, product.id);
                if quantity <= 0 {
                    return None;
                }
                let unit_price = product.new_price.unwrap_or(0.0);
                Some(OrderLine {
                    product_id: product.id,
                    name: product.name.clone(),
                    unit_price,
                    quantity,
                    line_total: unit_price * quantity as f64,
                })
            })
            .collect();

        let subtotal: f64 = lines.iter().map(|l| l.line_total).sum();
        let tax = subtotal * TAX_RATE;
        OrderSummary {
            lines,
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

pub struct Checkout<'a, A: CartApi + ?Sized> {
    api: &'a A,
    strategy: DrainStrategy,
    state: CheckoutState,
}

impl<'a, A: CartApi + ?Sized> Checkout<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Checkout {
            api,
            strategy: DrainStrategy::default(),
            state: CheckoutState::CollectingInput,
        }
    }

    pub fn with_strategy(mut self, strategy: DrainStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    /// Runs one checkout attempt for `cart`. A validation failure returns to
    /// collecting input; a drain failure ends in the error state.
    pub async fn submit(
        &mut self,
        form: &CheckoutForm,
        method: PaymentMethod,
        cart: &CartMap,
    ) -> Result<DrainReport, CheckoutError> {
        if !cart.values().any(|quantity| *quantity > 0) {
            self.state = CheckoutState::CollectingInput;
            return Err(CheckoutError::EmptyCart);
        }

        self.state = CheckoutState::Validating;
        let missing = form.missing_fields(method);
        if !missing.is_empty() {
            self.state = CheckoutState::CollectingInput;
            return Err(CheckoutError::MissingFields(missing));
        }

        self.state = CheckoutState::Processing;
        log::info!("Processing simulated {:?} payment", method);

        match self.drain(cart).await {
            Ok(calls) => {
                self.state = CheckoutState::Done;
                Ok(DrainReport { calls })
            }
            Err(e) => {
                log::error!("Payment error: {}", e);
                self.state = CheckoutState::Error;
                Err(e)
            }
        }
    }

    async fn drain(&self, cart: &CartMap) -> Result<usize, CheckoutError> {
        match self.strategy {
            DrainStrategy::Bulk => {
                self.api.clear().await.map_err(|source| CheckoutError::Drain {
                    calls_completed: 0,
                    source,
                })?;
                Ok(1)
            }
            DrainStrategy::PerUnit => {
                let mut calls = 0;
                for (key, &quantity) in cart {
                    let Ok(item_id) = key.parse::<i64>() else {
                        log::warn!("Skipping cart entry with non-numeric id {:?}", key);
                        continue;
                    };
                    for _ in 0..quantity.max(0) {
                        self.api.remove_one(item_id).await.map_err(|source| {
                            CheckoutError::Drain {
                                calls_completed: calls,
                                source,
                            }
                        })?;
                        calls += 1;
                    }
                }
                Ok(calls)
            }
        }
    }
}
