/*!
 * Type Definitions for the Invoice Factoring Marketplace Contract
 *
 * This module defines the persisted record kinds, the invoice status enum,
 * the typed error codes, and the event topic constants used throughout the
 * contract. Amounts are `i128` in the settlement token's smallest unit,
 * rates are `u32` basis points on a 10000 scale, and heights are `u32`
 * ledger sequence numbers.
 */

use soroban_sdk::{contracterror, contracttype, symbol_short, Address, String, Symbol};

// ================================================================================================
// CORE DATA STRUCTURES
// ================================================================================================

/// An outstanding invoice listed for sale at a discount.
///
/// Created by the seller in `Available` status. The discounted amount is
/// derived once at creation from the original amount and the discount rate
/// and never recomputed afterwards.
///
/// # Lifecycle
/// - Available: listed, open for purchase
/// - Sold: bought by an investor, awaiting the debtor's repayment
/// - Paid: repayment confirmed by the buyer (terminal)
/// - Disputed: temporary suspension of Sold pending admin resolution
/// - Expired: terminal for both overdue/defaulted and cancelled invoices
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Invoice {
    /// Unique id, assigned from a strictly increasing counter, never reused
    pub id: u64,

    /// The address that listed the invoice and receives the sale proceeds
    pub seller: Address,

    /// The party that owes the original amount. Repayment settles outside
    /// the contract and is recorded via payment confirmation.
    pub debtor: Address,

    /// Face value of the invoice in the settlement token's smallest unit
    pub original_amount: i128,

    /// Discount applied at listing, in basis points (1-10000 scale)
    pub discount_rate_bps: u32,

    /// Sale price: `original_amount - floor(original_amount * rate / 10000)`.
    /// Computed once at creation.
    pub discounted_amount: i128,

    /// Ledger height by which the debtor is expected to have paid
    pub due_height: u32,

    /// Ledger height at which the invoice was listed
    pub created_height: u32,

    /// Current lifecycle status
    pub status: InvoiceStatus,

    /// Free-text description of the underlying receivable
    pub description: String,

    /// Free-text invoice label, not required to be unique
    pub invoice_number: String,
}

/// The purchase of an invoice by an investor.
///
/// Exists exactly when the invoice has reached `Sold` at least once.
/// Created once per invoice; the only later mutation is the
/// `payment_received` flag flipping false to true when the buyer confirms
/// the debtor's repayment. The flag is never reset.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Purchase {
    /// The investor who bought the invoice and collects the repayment
    pub buyer: Address,

    /// Price paid, equal to the invoice's discounted amount at sale time
    pub purchase_price: i128,

    /// Ledger height of the purchase
    pub purchase_height: u32,

    /// Whether the debtor's repayment has been confirmed
    pub payment_received: bool,
}

/// Aggregated statistics for a seller, keyed by the seller's address.
///
/// Materialized lazily on first write; lookups of absent ratings return the
/// zero value instead of a missing record.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SellerRating {
    /// Invoices ever listed by this seller
    pub total_invoices: u32,

    /// Invoices that reached Paid
    pub successful_invoices: u32,

    /// Invoices that have had a dispute filed against them
    pub disputed_invoices: u32,

    /// Reserved. Carried in storage but not computed by any operation.
    pub average_rating: u32,

    /// Sum of original amounts across all listed invoices
    pub total_volume: i128,
}

impl SellerRating {
    pub fn zero() -> Self {
        SellerRating {
            total_invoices: 0,
            successful_invoices: 0,
            disputed_invoices: 0,
            average_rating: 0,
            total_volume: 0,
        }
    }
}

/// Aggregated statistics for a buyer, keyed by the buyer's address.
/// Same lazy-default rule as `SellerRating`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuyerRating {
    /// Invoices ever purchased by this buyer
    pub total_purchases: u32,

    /// Purchases whose repayment was confirmed
    pub successful_purchases: u32,

    /// Sum of purchase prices across all purchases
    pub total_invested: i128,

    /// Running sum of `amount_paid - purchase_price` over confirmations.
    /// Signed: an underpaying debtor produces a negative contribution and
    /// no floor is applied.
    pub returns_earned: i128,
}

impl BuyerRating {
    pub fn zero() -> Self {
        BuyerRating {
            total_purchases: 0,
            successful_purchases: 0,
            total_invested: 0,
            returns_earned: 0,
        }
    }
}

/// Write-once record of the debtor's repayment, keyed by invoice id.
/// Exists exactly when payment has been confirmed.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PaymentConfirmation {
    /// The address that confirmed (always the purchase's buyer)
    pub confirmer: Address,

    /// Ledger height of the confirmation
    pub confirmation_height: u32,

    /// Amount the debtor actually paid. May differ from the face value.
    pub amount_paid: i128,
}

/// Dispute state for an invoice, keyed by invoice id.
///
/// Created by filing, mutated once by resolution (`resolved` flips false to
/// true and the resolution text is set). A dispute filed after an earlier
/// one was resolved replaces the record.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DisputeRecord {
    /// Who filed: the purchase's buyer or the invoice's seller
    pub disputer: Address,

    /// Free-text reason given at filing
    pub reason: String,

    /// Ledger height of the filing
    pub dispute_height: u32,

    /// Whether an admin has resolved this dispute
    pub resolved: bool,

    /// Admin's resolution text, set when resolved
    pub resolution: Option<String>,
}

/// Platform-wide parameters and the collected-fee pool. Singleton record,
/// mutated only through the admin surface.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlatformConfig {
    /// Fee withheld from the seller's proceeds on each purchase, in basis
    /// points. Capped at 1000 (10%).
    pub fee_rate_bps: u32,

    /// Lowest discount rate accepted at invoice creation
    pub min_discount_bps: u32,

    /// Highest discount rate accepted at invoice creation. Capped at 5000.
    pub max_discount_bps: u32,

    /// Accrued platform fees still held by the contract. Increases on each
    /// purchase, decreases on admin withdrawal, never negative.
    pub fees_collected: i128,
}

/// Aggregate marketplace counters returned by `get_platform_stats`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlatformStats {
    /// Invoices issued so far
    pub total_invoices: u64,

    /// Current fee pool balance
    pub fees_collected: i128,

    /// Current platform fee rate in basis points
    pub fee_rate_bps: u32,

    /// Current discount floor in basis points
    pub min_discount_bps: u32,

    /// Current discount ceiling in basis points
    pub max_discount_bps: u32,
}

// ================================================================================================
// ENUMERATIONS
// ================================================================================================

/// Lifecycle status of an invoice.
///
/// # State Transition Rules
/// - Available -> Sold (purchase)
/// - Available -> Expired (seller cancellation)
/// - Sold -> Paid (payment confirmation)
/// - Sold -> Disputed (dispute filing)
/// - Sold -> Expired (marked overdue past the due height)
/// - Disputed -> Sold (admin resolution)
///
/// Paid and Expired are terminal. Expired covers both the overdue/defaulted
/// and the cancelled outcome; the two are distinguishable only by the event
/// emitted at transition time.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InvoiceStatus {
    /// Listed and open for purchase
    Available,

    /// Purchased, awaiting the debtor's repayment
    Sold,

    /// Repayment confirmed. Terminal.
    Paid,

    /// Suspended pending admin dispute resolution
    Disputed,

    /// Overdue, defaulted or cancelled. Terminal.
    Expired,
}

// ================================================================================================
// ERROR DEFINITIONS
// ================================================================================================

/// Typed failure codes for every operation.
///
/// Every precondition failure is detected before any mutation and returned
/// synchronously; a failed invocation leaves no record or balance change.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Caller lacks the required role or relationship to the invoice
    Unauthorized = 1,

    /// Referenced invoice or record does not exist
    NotFound = 2,

    /// Non-positive or out-of-bound numeric input
    InvalidAmount = 3,

    /// Discount rate outside the configured bounds, or min >= max on a
    /// bounds update
    InvalidDiscount = 4,

    /// Due height is not in the future at a point that requires it to be
    Expired = 5,

    /// Invoice is not Available for purchase
    NotAvailable = 6,

    /// A seller cannot buy their own invoice
    CannotBuyOwnInvoice = 7,

    /// Payment was already confirmed for this invoice
    AlreadyConfirmed = 8,

    /// Operation is not allowed in the invoice's current status
    InvalidStatus = 9,

    /// The due height has not yet passed
    NotYetOverdue = 10,

    /// Withdrawal exceeds the collected fees, or the payer's balance does
    /// not cover the purchase price
    InsufficientFunds = 11,

    /// The underlying token transfer failed
    TokenTransferFailed = 12,
}

// ================================================================================================
// EVENT CONSTANTS
// ================================================================================================
// One topic per state transition, for off-chain indexing of marketplace
// activity.

/// New invoice listed. Contains: (invoice_id, original_amount, discounted_amount, due_height)
pub const INVOICE_CREATED: Symbol = symbol_short!("inv_crt");

/// Invoice purchased. Contains: (invoice_id, purchase_price, fee_amount)
pub const INVOICE_SOLD: Symbol = symbol_short!("inv_sold");

/// Debtor repayment confirmed. Contains: (invoice_id, amount_paid)
pub const PAYMENT_CONFIRMED: Symbol = symbol_short!("pay_conf");

/// Dispute filed. Contains: (invoice_id,)
pub const DISPUTE_FILED: Symbol = symbol_short!("dis_file");

/// Dispute resolved by the admin. Contains: (invoice_id,)
pub const DISPUTE_RESOLVED: Symbol = symbol_short!("dis_resl");

/// Sold invoice marked overdue. Contains: (invoice_id,)
pub const INVOICE_OVERDUE: Symbol = symbol_short!("inv_ovrd");

/// Available invoice cancelled by its seller. Contains: (invoice_id,)
pub const INVOICE_CANCELLED: Symbol = symbol_short!("inv_canc");

/// Platform fees withdrawn. Contains: (amount, remaining_pool)
pub const FEES_WITHDRAWN: Symbol = symbol_short!("fee_wdrw");

/// Platform fee rate updated. Contains: (rate_bps,)
pub const FEE_RATE_UPDATED: Symbol = symbol_short!("fee_upd");

/// Discount bounds updated. Contains: (min_bps, max_bps)
pub const DISCOUNT_LIMITS_UPDATED: Symbol = symbol_short!("lim_upd");

/// Admin rotated. Contains: new admin address
pub const ADMIN_UPDATED: Symbol = symbol_short!("adm_upd");
