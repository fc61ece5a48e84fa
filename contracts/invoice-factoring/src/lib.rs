/*!
 * Invoice Factoring Marketplace Smart Contract
 *
 * This contract lets a seller list an outstanding invoice for sale at a
 * discount, lets an investor buy it for immediate capital via an escrow
 * mechanism, tracks the eventual repayment by the original debtor, and
 * resolves disputes. Key features:
 * - Escrowed purchase flow with a platform fee withheld from proceeds
 * - Basis-point pricing: discount, fee and return-on-investment all use
 *   truncating integer division on a 10000 scale
 * - Reputation statistics accrued for sellers and buyers on every
 *   lifecycle transition
 * - Dispute filing and admin resolution that suspend and resume the Sold
 *   lifecycle
 * - Admin controls for the fee rate, the discount bounds and fee withdrawal
 * - Event emission on every state transition for off-chain indexing
 *
 * Business Logic:
 * 1. Sellers list invoices with a discount rate inside the configured bounds
 * 2. Investors buy them: the discounted amount moves buyer -> escrow, the
 *    amount net of the platform fee moves escrow -> seller, the fee stays
 *    in the contract-held pool
 * 3. The debtor repays the buyer outside the contract; the buyer records
 *    the repayment, which closes the invoice as Paid
 * 4. Either party can file a dispute while Sold; the admin resolves it,
 *    returning the invoice to Sold
 * 5. Anyone can mark a Sold invoice Expired once its due height has passed
 *
 * Every mutating operation authenticates the explicitly-passed caller,
 * validates all preconditions before any transfer, transfers before any
 * record write, and returns a typed error otherwise. A failed invocation
 * is rolled back by the host in its entirety, so a failed operation is
 * indistinguishable from one never attempted.
 */

#![no_std]

mod types;


use soroban_sdk::{
    contract, contractimpl, log, symbol_short, token, Address, Env, Map, String, Symbol,
};

use types::{
    BuyerRating, DisputeRecord, Error, Invoice, InvoiceStatus, PaymentConfirmation,
    PlatformConfig, PlatformStats, Purchase, SellerRating, ADMIN_UPDATED,
    DISCOUNT_LIMITS_UPDATED, DISPUTE_FILED, DISPUTE_RESOLVED, FEES_WITHDRAWN, FEE_RATE_UPDATED,
    INVOICE_CANCELLED, INVOICE_CREATED, INVOICE_OVERDUE, INVOICE_SOLD, PAYMENT_CONFIRMED,
};

#[contract]
pub struct InvoiceFactoringContract;

// Storage keys - short symbols for cheap storage access
// Persistent storage holds configuration that must survive the instance;
// instance storage holds the runtime record maps and the id counter
const ADMIN_KEY: Symbol = symbol_short!("ADMIN"); // Admin address (persistent)
const TOKEN_KEY: Symbol = symbol_short!("TOKEN"); // Settlement token contract address (persistent)
const CONFIG_KEY: Symbol = symbol_short!("CONFIG"); // PlatformConfig singleton (persistent)
const INVOICES_KEY: Symbol = symbol_short!("INVOICES"); // Map of invoices by id (instance)
const PURCHASES_KEY: Symbol = symbol_short!("PURCHASES"); // Map of purchases by invoice id (instance)
const SELLER_RATINGS_KEY: Symbol = symbol_short!("SLR_RTGS"); // Map of seller ratings by address (instance)
const BUYER_RATINGS_KEY: Symbol = symbol_short!("BYR_RTGS"); // Map of buyer ratings by address (instance)
const CONFIRMATIONS_KEY: Symbol = symbol_short!("PAY_CNFS"); // Map of payment confirmations by invoice id (instance)
const DISPUTES_KEY: Symbol = symbol_short!("DISPUTES"); // Map of dispute records by invoice id (instance)
const NEXT_INVOICE_ID_KEY: Symbol = symbol_short!("NEXT_INV"); // Counter for invoice ids (instance)

// Default configuration values seeded at initialization
const DEFAULT_FEE_RATE_BPS: u32 = 250; // 2.5% platform fee
const DEFAULT_MIN_DISCOUNT_BPS: u32 = 100; // 1% minimum discount
const DEFAULT_MAX_DISCOUNT_BPS: u32 = 5_000; // 50% maximum discount

// Hard caps on admin-configurable rates
const MAX_FEE_RATE_BPS: u32 = 1_000; // 10%
const MAX_DISCOUNT_CAP_BPS: u32 = 5_000; // 50%
const BASIS_POINTS_DIVISOR: u32 = 10_000; // Standard basis points denominator

// Ids start at 1 and increase strictly; an id is never reused
const FIRST_INVOICE_ID: u64 = 1;

#[contractimpl]
impl InvoiceFactoringContract {
    /// Initializes the marketplace with its admin and settlement token.
    /// Can only be called once.
    ///
    /// # Arguments
    /// * `admin` - The address with administrative privileges (fee rate,
    ///   discount bounds, dispute resolution, fee withdrawal)
    /// * `token_id` - The contract address of the settlement token
    ///
    /// # Behavior
    /// - Validates the token address by probing its `decimals()`
    /// - Seeds the platform config with the default fee rate and discount
    ///   bounds
    /// - Materializes the empty record maps and sets the id counter to 1
    pub fn initialize(env: Env, admin: Address, token_id: Address) -> Result<(), Error> {
        if env.storage().persistent().has(&ADMIN_KEY) {
            panic!("Contract already initialized");
        }

        // Probing decimals() fails the invocation if the address does not
        // implement the token interface
        let token_client = token::Client::new(&env, &token_id);
        let _ = token_client.decimals();

        env.storage().persistent().set(&ADMIN_KEY, &admin);
        env.storage().persistent().set(&TOKEN_KEY, &token_id);
        env.storage().persistent().set(
            &CONFIG_KEY,
            &PlatformConfig {
                fee_rate_bps: DEFAULT_FEE_RATE_BPS,
                min_discount_bps: DEFAULT_MIN_DISCOUNT_BPS,
                max_discount_bps: DEFAULT_MAX_DISCOUNT_BPS,
                fees_collected: 0,
            },
        );

        env.storage()
            .instance()
            .set(&NEXT_INVOICE_ID_KEY, &FIRST_INVOICE_ID);
        env.storage()
            .instance()
            .set(&INVOICES_KEY, &Map::<u64, Invoice>::new(&env));
        env.storage()
            .instance()
            .set(&PURCHASES_KEY, &Map::<u64, Purchase>::new(&env));
        env.storage()
            .instance()
            .set(&SELLER_RATINGS_KEY, &Map::<Address, SellerRating>::new(&env));
        env.storage()
            .instance()
            .set(&BUYER_RATINGS_KEY, &Map::<Address, BuyerRating>::new(&env));
        env.storage()
            .instance()
            .set(&CONFIRMATIONS_KEY, &Map::<u64, PaymentConfirmation>::new(&env));
        env.storage()
            .instance()
            .set(&DISPUTES_KEY, &Map::<u64, DisputeRecord>::new(&env));

        Ok(())
    }

    // ================================================================================================
    // INTERNAL HELPERS
    // ================================================================================================

    /// Verifies that `caller` is the stored admin and has authorized this
    /// invocation. Every admin-only entry point goes through here.
    fn _require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
        caller.require_auth();
        let admin: Address = env.storage().persistent().get(&ADMIN_KEY).unwrap();
        if *caller != admin {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    /// Basis-point share of an amount with truncating division:
    /// `floor(amount * rate_bps / 10000)`.
    ///
    /// Amounts above `i128::MAX / 10000` are divided first so the
    /// multiplication cannot overflow; this trades a little precision for
    /// a total function over the full amount range.
    fn _calculate_fee(amount: i128, rate_bps: u32) -> i128 {
        const MAX_SAFE_AMOUNT: i128 = i128::MAX / (BASIS_POINTS_DIVISOR as i128);

        if amount > MAX_SAFE_AMOUNT {
            (amount / (BASIS_POINTS_DIVISOR as i128)).saturating_mul(rate_bps as i128)
        } else {
            amount.saturating_mul(rate_bps as i128) / (BASIS_POINTS_DIVISOR as i128)
        }
    }

    /// Sale price after discount: `original - floor(original * rate / 10000)`.
    /// The discount share uses the same truncating basis-point rule as the
    /// platform fee; no other rounding exists in the contract.
    fn _discounted_amount(original: i128, discount_rate_bps: u32) -> i128 {
        original - Self::_calculate_fee(original, discount_rate_bps)
    }

    /// Return on investment in basis points:
    /// `floor((original - discounted) * 10000 / discounted)`, 0 when the
    /// discounted amount is 0.
    fn _calculate_roi(original: i128, discounted: i128) -> u32 {
        if discounted == 0 {
            return 0;
        }
        let spread = original - discounted;
        (spread.saturating_mul(BASIS_POINTS_DIVISOR as i128) / discounted) as u32
    }

    /// Current platform configuration. Set at initialize, so the read
    /// cannot miss.
    fn _config(env: &Env) -> PlatformConfig {
        env.storage().persistent().get(&CONFIG_KEY).unwrap()
    }

    // ================================================================================================
    // INVOICE LIFECYCLE
    // ================================================================================================

    /// Lists a new invoice for sale.
    ///
    /// # Business Flow
    /// 1. Validates the amount, the discount rate against the current
    ///    bounds, and that the due height is in the future
    /// 2. Allocates the next invoice id and derives the discounted amount
    /// 3. Stores the invoice in Available status
    /// 4. Bumps the seller's total_invoices and total_volume, creating the
    ///    rating record on first use
    ///
    /// # Arguments
    /// * `seller` - The address listing the invoice (must sign)
    /// * `debtor` - The party owing the original amount
    /// * `original_amount` - Face value, must be positive
    /// * `discount_rate_bps` - Discount in basis points, inside the
    ///   configured bounds
    /// * `due_height` - Ledger height by which repayment is expected,
    ///   must be in the future
    /// * `description` - Free text describing the receivable
    /// * `invoice_number` - Free-text label, not required unique
    ///
    /// # Returns
    /// The id of the created invoice
    ///
    /// # Errors
    /// - InvalidAmount: original_amount is not positive
    /// - InvalidDiscount: rate outside the configured bounds
    /// - Expired: due height is not in the future
    pub fn create_invoice(
        env: Env,
        seller: Address,
        debtor: Address,
        original_amount: i128,
        discount_rate_bps: u32,
        due_height: u32,
        description: String,
        invoice_number: String,
    ) -> Result<u64, Error> {
        seller.require_auth();

        if original_amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let config = Self::_config(&env);
        if discount_rate_bps < config.min_discount_bps
            || discount_rate_bps > config.max_discount_bps
        {
            return Err(Error::InvalidDiscount);
        }

        let current_height = env.ledger().sequence();
        if due_height <= current_height {
            return Err(Error::Expired);
        }

        // Derived once here; never recomputed, even if the bounds change later
        let discounted_amount = Self::_discounted_amount(original_amount, discount_rate_bps);

        let mut invoices: Map<u64, Invoice> =
            env.storage().instance().get(&INVOICES_KEY).unwrap();
        let invoice_id: u64 = env.storage().instance().get(&NEXT_INVOICE_ID_KEY).unwrap();

        let invoice = Invoice {
            id: invoice_id,
            seller: seller.clone(),
            debtor,
            original_amount,
            discount_rate_bps,
            discounted_amount,
            due_height,
            created_height: current_height,
            status: InvoiceStatus::Available,
            description,
            invoice_number,
        };

        invoices.set(invoice_id, invoice);
        env.storage().instance().set(&INVOICES_KEY, &invoices);
        env.storage()
            .instance()
            .set(&NEXT_INVOICE_ID_KEY, &(invoice_id + 1));

        // Reputation: listing counts toward the seller's volume immediately
        let mut seller_ratings: Map<Address, SellerRating> =
            env.storage().instance().get(&SELLER_RATINGS_KEY).unwrap();
        let mut rating = seller_ratings
            .get(seller.clone())
            .unwrap_or_else(SellerRating::zero);
        rating.total_invoices += 1;
        rating.total_volume += original_amount;
        seller_ratings.set(seller.clone(), rating);
        env.storage()
            .instance()
            .set(&SELLER_RATINGS_KEY, &seller_ratings);

        env.events().publish(
            (INVOICE_CREATED, seller),
            (invoice_id, original_amount, discounted_amount, due_height),
        );

        Ok(invoice_id)
    }

    /// Buys an Available invoice for its discounted amount.
    ///
    /// # Business Flow
    /// 1. Validates the invoice is Available, not the buyer's own listing,
    ///    not yet due, and that the buyer's balance covers the price
    /// 2. Transfers the purchase price from the buyer into escrow, then the
    ///    price net of the platform fee from escrow to the seller; the fee
    ///    remains in the contract-held pool
    /// 3. Marks the invoice Sold, creates the Purchase record, accrues the
    ///    fee, and bumps the buyer's statistics
    ///
    /// All preconditions are checked before the first transfer; record
    /// writes happen only after both transfers succeeded.
    ///
    /// # Arguments
    /// * `buyer` - The investor purchasing the invoice (must sign)
    /// * `invoice_id` - The invoice to purchase
    ///
    /// # Returns
    /// The amount paid (the invoice's discounted amount)
    ///
    /// # Errors
    /// - NotFound: no such invoice
    /// - NotAvailable: invoice is not in Available status
    /// - CannotBuyOwnInvoice: buyer is the seller
    /// - Expired: the due height has been reached
    /// - InsufficientFunds: buyer balance below the purchase price
    /// - TokenTransferFailed: an underlying transfer failed
    pub fn purchase_invoice(env: Env, buyer: Address, invoice_id: u64) -> Result<i128, Error> {
        buyer.require_auth();

        let mut invoices: Map<u64, Invoice> =
            env.storage().instance().get(&INVOICES_KEY).unwrap();
        let mut invoice = invoices.get(invoice_id).ok_or(Error::NotFound)?;

        if invoice.status != InvoiceStatus::Available {
            return Err(Error::NotAvailable);
        }
        if buyer == invoice.seller {
            return Err(Error::CannotBuyOwnInvoice);
        }
        if env.ledger().sequence() >= invoice.due_height {
            return Err(Error::Expired);
        }

        let mut config = Self::_config(&env);
        let purchase_price = invoice.discounted_amount;
        let fee_amount = Self::_calculate_fee(purchase_price, config.fee_rate_bps);
        let seller_amount = purchase_price - fee_amount;

        let token_id: Address = env.storage().persistent().get(&TOKEN_KEY).unwrap();
        let token_client = token::Client::new(&env, &token_id);

        let buyer_balance = token_client.balance(&buyer);
        if buyer_balance < purchase_price {
            log!(
                &env,
                "Insufficient balance. Required: {}, Available: {}",
                purchase_price,
                buyer_balance
            );
            return Err(Error::InsufficientFunds);
        }

        // Escrow leg: buyer pays the full discounted amount to the contract
        match token_client.try_transfer(&buyer, &env.current_contract_address(), &purchase_price)
        {
            Ok(_) => {}
            Err(_) => {
                log!(&env, "Escrow transfer failed for amount: {}", purchase_price);
                return Err(Error::TokenTransferFailed);
            }
        }

        // Payout leg: seller receives the price net of the platform fee.
        // Returning an error here fails the invocation and the host rolls
        // back the escrow leg with it.
        match token_client.try_transfer(
            &env.current_contract_address(),
            &invoice.seller,
            &seller_amount,
        ) {
            Ok(_) => {}
            Err(_) => {
                log!(&env, "Payout transfer failed for amount: {}", seller_amount);
                return Err(Error::TokenTransferFailed);
            }
        }

        invoice.status = InvoiceStatus::Sold;
        invoices.set(invoice_id, invoice);
        env.storage().instance().set(&INVOICES_KEY, &invoices);

        let mut purchases: Map<u64, Purchase> =
            env.storage().instance().get(&PURCHASES_KEY).unwrap();
        purchases.set(
            invoice_id,
            Purchase {
                buyer: buyer.clone(),
                purchase_price,
                purchase_height: env.ledger().sequence(),
                payment_received: false,
            },
        );
        env.storage().instance().set(&PURCHASES_KEY, &purchases);

        // The withheld fee stays on the contract balance; the pool counter
        // tracks how much of that balance is withdrawable
        config.fees_collected += fee_amount;
        env.storage().persistent().set(&CONFIG_KEY, &config);

        let mut buyer_ratings: Map<Address, BuyerRating> =
            env.storage().instance().get(&BUYER_RATINGS_KEY).unwrap();
        let mut rating = buyer_ratings
            .get(buyer.clone())
            .unwrap_or_else(BuyerRating::zero);
        rating.total_purchases += 1;
        rating.total_invested += purchase_price;
        buyer_ratings.set(buyer.clone(), rating);
        env.storage()
            .instance()
            .set(&BUYER_RATINGS_KEY, &buyer_ratings);

        env.events().publish(
            (INVOICE_SOLD, buyer),
            (invoice_id, purchase_price, fee_amount),
        );

        Ok(purchase_price)
    }

    /// Records the debtor's repayment and closes the invoice as Paid.
    ///
    /// Repayment settles outside the contract, directly between the debtor
    /// and the buyer; this operation is the buyer's write-once attestation
    /// of it. The amount paid may differ from the face value in either
    /// direction, and the buyer's returns_earned absorbs the signed
    /// difference against the purchase price with no floor.
    ///
    /// # Arguments
    /// * `caller` - Must be the purchase's buyer (must sign)
    /// * `invoice_id` - The invoice being repaid
    /// * `amount_paid` - What the debtor actually paid, must be positive
    ///
    /// # Returns
    /// The recorded amount paid
    ///
    /// # Errors
    /// - NotFound: no purchase exists for this invoice
    /// - Unauthorized: caller is not the buyer
    /// - AlreadyConfirmed: payment was confirmed before
    /// - InvalidStatus: invoice is not in Sold status
    /// - InvalidAmount: amount_paid is not positive
    pub fn confirm_payment(
        env: Env,
        caller: Address,
        invoice_id: u64,
        amount_paid: i128,
    ) -> Result<i128, Error> {
        caller.require_auth();

        let mut purchases: Map<u64, Purchase> =
            env.storage().instance().get(&PURCHASES_KEY).unwrap();
        let mut purchase = purchases.get(invoice_id).ok_or(Error::NotFound)?;

        if caller != purchase.buyer {
            return Err(Error::Unauthorized);
        }
        // The received flag outlives the Sold status, so a repeat
        // confirmation reports the double-confirm rather than a generic
        // wrong-phase error
        if purchase.payment_received {
            return Err(Error::AlreadyConfirmed);
        }

        let mut invoices: Map<u64, Invoice> =
            env.storage().instance().get(&INVOICES_KEY).unwrap();
        let mut invoice = invoices.get(invoice_id).ok_or(Error::NotFound)?;

        if invoice.status != InvoiceStatus::Sold {
            return Err(Error::InvalidStatus);
        }
        if amount_paid <= 0 {
            return Err(Error::InvalidAmount);
        }

        let mut confirmations: Map<u64, PaymentConfirmation> =
            env.storage().instance().get(&CONFIRMATIONS_KEY).unwrap();
        confirmations.set(
            invoice_id,
            PaymentConfirmation {
                confirmer: caller.clone(),
                confirmation_height: env.ledger().sequence(),
                amount_paid,
            },
        );
        env.storage()
            .instance()
            .set(&CONFIRMATIONS_KEY, &confirmations);

        purchase.payment_received = true;
        purchases.set(invoice_id, purchase.clone());
        env.storage().instance().set(&PURCHASES_KEY, &purchases);

        invoice.status = InvoiceStatus::Paid;
        let seller = invoice.seller.clone();
        invoices.set(invoice_id, invoice);
        env.storage().instance().set(&INVOICES_KEY, &invoices);

        let mut seller_ratings: Map<Address, SellerRating> =
            env.storage().instance().get(&SELLER_RATINGS_KEY).unwrap();
        let mut seller_rating = seller_ratings
            .get(seller.clone())
            .unwrap_or_else(SellerRating::zero);
        seller_rating.successful_invoices += 1;
        seller_ratings.set(seller, seller_rating);
        env.storage()
            .instance()
            .set(&SELLER_RATINGS_KEY, &seller_ratings);

        let mut buyer_ratings: Map<Address, BuyerRating> =
            env.storage().instance().get(&BUYER_RATINGS_KEY).unwrap();
        let mut buyer_rating = buyer_ratings
            .get(caller.clone())
            .unwrap_or_else(BuyerRating::zero);
        buyer_rating.successful_purchases += 1;
        // Signed difference: an underpaying debtor reduces lifetime returns
        buyer_rating.returns_earned += amount_paid - purchase.purchase_price;
        buyer_ratings.set(caller.clone(), buyer_rating);
        env.storage()
            .instance()
            .set(&BUYER_RATINGS_KEY, &buyer_ratings);

        env.events()
            .publish((PAYMENT_CONFIRMED, caller), (invoice_id, amount_paid));

        Ok(amount_paid)
    }

    // ================================================================================================
    // DISPUTE RESOLUTION SYSTEM
    // ================================================================================================

    /// Files a dispute on a Sold invoice.
    ///
    /// Either side of the trade can file: the purchase's buyer or the
    /// invoice's seller. Filing suspends the invoice in Disputed status
    /// until the admin resolves it. A dispute filed after an earlier one
    /// was resolved replaces the old record.
    ///
    /// # Arguments
    /// * `caller` - The buyer or the seller (must sign)
    /// * `invoice_id` - The invoice under dispute
    /// * `reason` - Free-text reason for the dispute
    ///
    /// # Errors
    /// - NotFound: no such invoice or no purchase for it
    /// - InvalidStatus: invoice is not Sold (an already-open dispute means
    ///   Disputed status and lands here too)
    /// - Unauthorized: caller is neither the buyer nor the seller
    pub fn file_dispute(
        env: Env,
        caller: Address,
        invoice_id: u64,
        reason: String,
    ) -> Result<(), Error> {
        caller.require_auth();

        let mut invoices: Map<u64, Invoice> =
            env.storage().instance().get(&INVOICES_KEY).unwrap();
        let mut invoice = invoices.get(invoice_id).ok_or(Error::NotFound)?;

        if invoice.status != InvoiceStatus::Sold {
            return Err(Error::InvalidStatus);
        }

        // Sold guarantees the purchase exists
        let purchases: Map<u64, Purchase> =
            env.storage().instance().get(&PURCHASES_KEY).unwrap();
        let purchase = purchases.get(invoice_id).ok_or(Error::NotFound)?;

        if caller != purchase.buyer && caller != invoice.seller {
            return Err(Error::Unauthorized);
        }

        let mut disputes: Map<u64, DisputeRecord> =
            env.storage().instance().get(&DISPUTES_KEY).unwrap();
        disputes.set(
            invoice_id,
            DisputeRecord {
                disputer: caller.clone(),
                reason,
                dispute_height: env.ledger().sequence(),
                resolved: false,
                resolution: None,
            },
        );
        env.storage().instance().set(&DISPUTES_KEY, &disputes);

        invoice.status = InvoiceStatus::Disputed;
        let seller = invoice.seller.clone();
        invoices.set(invoice_id, invoice);
        env.storage().instance().set(&INVOICES_KEY, &invoices);

        let mut seller_ratings: Map<Address, SellerRating> =
            env.storage().instance().get(&SELLER_RATINGS_KEY).unwrap();
        let mut rating = seller_ratings
            .get(seller.clone())
            .unwrap_or_else(SellerRating::zero);
        rating.disputed_invoices += 1;
        seller_ratings.set(seller, rating);
        env.storage()
            .instance()
            .set(&SELLER_RATINGS_KEY, &seller_ratings);

        env.events().publish((DISPUTE_FILED, caller), (invoice_id,));

        Ok(())
    }

    /// Resolves a disputed invoice. Admin only.
    ///
    /// Resolution does not pick a winner and moves no funds; it records the
    /// admin's resolution text and returns the invoice to Sold, so the
    /// normal confirm/dispute cycle can continue.
    ///
    /// # Arguments
    /// * `caller` - Must be the admin (must sign)
    /// * `invoice_id` - The disputed invoice
    /// * `resolution` - Free-text resolution recorded on the dispute
    ///
    /// # Errors
    /// - Unauthorized: caller is not the admin
    /// - NotFound: no such invoice or no dispute record for it
    /// - InvalidStatus: invoice is not Disputed
    pub fn resolve_dispute(
        env: Env,
        caller: Address,
        invoice_id: u64,
        resolution: String,
    ) -> Result<(), Error> {
        Self::_require_admin(&env, &caller)?;

        let mut disputes: Map<u64, DisputeRecord> =
            env.storage().instance().get(&DISPUTES_KEY).unwrap();
        let mut dispute = disputes.get(invoice_id).ok_or(Error::NotFound)?;

        let mut invoices: Map<u64, Invoice> =
            env.storage().instance().get(&INVOICES_KEY).unwrap();
        let mut invoice = invoices.get(invoice_id).ok_or(Error::NotFound)?;

        if invoice.status != InvoiceStatus::Disputed {
            return Err(Error::InvalidStatus);
        }

        dispute.resolved = true;
        dispute.resolution = Some(resolution);
        disputes.set(invoice_id, dispute);
        env.storage().instance().set(&DISPUTES_KEY, &disputes);

        invoice.status = InvoiceStatus::Sold;
        invoices.set(invoice_id, invoice);
        env.storage().instance().set(&INVOICES_KEY, &invoices);

        env.events()
            .publish((DISPUTE_RESOLVED, caller), (invoice_id,));

        Ok(())
    }

    /// Marks a Sold invoice Expired once its due height has passed.
    ///
    /// Any authenticated caller may do this; the check is purely against
    /// the ledger height. Expired doubles as the defaulted outcome, there
    /// is no separate overdue status.
    ///
    /// # Errors
    /// - NotFound: no such invoice
    /// - InvalidStatus: invoice is not Sold
    /// - NotYetOverdue: the due height has not strictly passed
    pub fn mark_overdue(env: Env, caller: Address, invoice_id: u64) -> Result<(), Error> {
        caller.require_auth();

        let mut invoices: Map<u64, Invoice> =
            env.storage().instance().get(&INVOICES_KEY).unwrap();
        let mut invoice = invoices.get(invoice_id).ok_or(Error::NotFound)?;

        if invoice.status != InvoiceStatus::Sold {
            return Err(Error::InvalidStatus);
        }
        if env.ledger().sequence() <= invoice.due_height {
            return Err(Error::NotYetOverdue);
        }

        invoice.status = InvoiceStatus::Expired;
        invoices.set(invoice_id, invoice);
        env.storage().instance().set(&INVOICES_KEY, &invoices);

        env.events()
            .publish((INVOICE_OVERDUE, caller), (invoice_id,));

        Ok(())
    }

    /// Withdraws an Available listing. Seller only.
    ///
    /// The invoice moves to the terminal Expired status; no funds are in
    /// play before a purchase, so nothing is transferred.
    ///
    /// # Errors
    /// - NotFound: no such invoice
    /// - Unauthorized: caller is not the seller
    /// - InvalidStatus: invoice is not Available
    pub fn cancel_invoice(env: Env, caller: Address, invoice_id: u64) -> Result<(), Error> {
        caller.require_auth();

        let mut invoices: Map<u64, Invoice> =
            env.storage().instance().get(&INVOICES_KEY).unwrap();
        let mut invoice = invoices.get(invoice_id).ok_or(Error::NotFound)?;

        if caller != invoice.seller {
            return Err(Error::Unauthorized);
        }
        if invoice.status != InvoiceStatus::Available {
            return Err(Error::InvalidStatus);
        }

        invoice.status = InvoiceStatus::Expired;
        invoices.set(invoice_id, invoice);
        env.storage().instance().set(&INVOICES_KEY, &invoices);

        env.events()
            .publish((INVOICE_CANCELLED, caller), (invoice_id,));

        Ok(())
    }

    // ================================================================================================
    // ADMINISTRATIVE FUNCTIONS
    // ================================================================================================

    /// Updates the platform fee rate charged on future purchases.
    ///
    /// # Arguments
    /// * `rate_bps` - New fee rate in basis points (max 1000 = 10%)
    ///
    /// # Errors
    /// - Unauthorized: caller is not the admin
    /// - InvalidAmount: rate exceeds 10%
    pub fn set_platform_fee_rate(env: Env, caller: Address, rate_bps: u32) -> Result<(), Error> {
        Self::_require_admin(&env, &caller)?;

        if rate_bps > MAX_FEE_RATE_BPS {
            return Err(Error::InvalidAmount);
        }

        let mut config = Self::_config(&env);
        config.fee_rate_bps = rate_bps;
        env.storage().persistent().set(&CONFIG_KEY, &config);

        env.events().publish((FEE_RATE_UPDATED, caller), (rate_bps,));

        Ok(())
    }

    /// Updates the discount bounds enforced at invoice creation.
    /// Existing invoices keep the rate they were created with.
    ///
    /// # Arguments
    /// * `min_bps` - New lowest accepted discount rate
    /// * `max_bps` - New highest accepted discount rate (max 5000 = 50%)
    ///
    /// # Errors
    /// - Unauthorized: caller is not the admin
    /// - InvalidDiscount: min >= max, or max above the 50% cap
    pub fn set_discount_limits(
        env: Env,
        caller: Address,
        min_bps: u32,
        max_bps: u32,
    ) -> Result<(), Error> {
        Self::_require_admin(&env, &caller)?;

        if min_bps >= max_bps || max_bps > MAX_DISCOUNT_CAP_BPS {
            return Err(Error::InvalidDiscount);
        }

        let mut config = Self::_config(&env);
        config.min_discount_bps = min_bps;
        config.max_discount_bps = max_bps;
        env.storage().persistent().set(&CONFIG_KEY, &config);

        env.events()
            .publish((DISCOUNT_LIMITS_UPDATED, caller), (min_bps, max_bps));

        Ok(())
    }

    /// Withdraws accrued platform fees to the admin.
    ///
    /// # Arguments
    /// * `amount` - How much to withdraw, at most the collected pool
    ///
    /// # Errors
    /// - Unauthorized: caller is not the admin
    /// - InvalidAmount: amount is not positive
    /// - InsufficientFunds: amount exceeds the collected fees
    /// - TokenTransferFailed: the payout transfer failed
    pub fn withdraw_platform_fees(env: Env, caller: Address, amount: i128) -> Result<(), Error> {
        Self::_require_admin(&env, &caller)?;

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let mut config = Self::_config(&env);
        if amount > config.fees_collected {
            return Err(Error::InsufficientFunds);
        }

        let token_id: Address = env.storage().persistent().get(&TOKEN_KEY).unwrap();
        let token_client = token::Client::new(&env, &token_id);

        match token_client.try_transfer(&env.current_contract_address(), &caller, &amount) {
            Ok(_) => {}
            Err(_) => {
                log!(&env, "Fee withdrawal transfer failed for amount: {}", amount);
                return Err(Error::TokenTransferFailed);
            }
        }

        config.fees_collected -= amount;
        env.storage().persistent().set(&CONFIG_KEY, &config);

        env.events()
            .publish((FEES_WITHDRAWN, caller), (amount, config.fees_collected));

        Ok(())
    }

    /// Transfers administrative control to a new address.
    /// The new admin must also authorize the call.
    ///
    /// # Errors
    /// - Unauthorized: caller is not the current admin
    pub fn update_admin(env: Env, caller: Address, new_admin: Address) -> Result<(), Error> {
        Self::_require_admin(&env, &caller)?;

        new_admin.require_auth();

        env.storage().persistent().set(&ADMIN_KEY, &new_admin);

        env.events()
            .publish((ADMIN_UPDATED, env.current_contract_address()), &new_admin);

        Ok(())
    }

    // ================================================================================================
    // QUERY FUNCTIONS (GETTERS)
    // ================================================================================================
    // Read-only access to contract state. No side effects, no authorization.

    /// Returns an invoice by id, if it exists.
    pub fn get_invoice(env: Env, invoice_id: u64) -> Option<Invoice> {
        let invoices: Map<u64, Invoice> = env.storage().instance().get(&INVOICES_KEY).unwrap();
        invoices.get(invoice_id)
    }

    /// Returns the purchase record for an invoice, if it was ever sold.
    pub fn get_invoice_purchase(env: Env, invoice_id: u64) -> Option<Purchase> {
        let purchases: Map<u64, Purchase> =
            env.storage().instance().get(&PURCHASES_KEY).unwrap();
        purchases.get(invoice_id)
    }

    /// Returns a seller's statistics, zero-valued if the seller has never
    /// listed an invoice.
    pub fn get_seller_rating(env: Env, seller: Address) -> SellerRating {
        let ratings: Map<Address, SellerRating> =
            env.storage().instance().get(&SELLER_RATINGS_KEY).unwrap();
        ratings.get(seller).unwrap_or_else(SellerRating::zero)
    }

    /// Returns a buyer's statistics, zero-valued if the buyer has never
    /// purchased an invoice.
    pub fn get_buyer_rating(env: Env, buyer: Address) -> BuyerRating {
        let ratings: Map<Address, BuyerRating> =
            env.storage().instance().get(&BUYER_RATINGS_KEY).unwrap();
        ratings.get(buyer).unwrap_or_else(BuyerRating::zero)
    }

    /// Returns the payment confirmation for an invoice, if one was recorded.
    pub fn get_payment_confirmation(env: Env, invoice_id: u64) -> Option<PaymentConfirmation> {
        let confirmations: Map<u64, PaymentConfirmation> =
            env.storage().instance().get(&CONFIRMATIONS_KEY).unwrap();
        confirmations.get(invoice_id)
    }

    /// Returns the dispute record for an invoice, if one was ever filed.
    pub fn get_dispute_record(env: Env, invoice_id: u64) -> Option<DisputeRecord> {
        let disputes: Map<u64, DisputeRecord> =
            env.storage().instance().get(&DISPUTES_KEY).unwrap();
        disputes.get(invoice_id)
    }

    /// Returns aggregate marketplace counters together with the current
    /// fee and discount configuration.
    pub fn get_platform_stats(env: Env) -> PlatformStats {
        let next_id: u64 = env.storage().instance().get(&NEXT_INVOICE_ID_KEY).unwrap();
        let config = Self::_config(&env);
        PlatformStats {
            total_invoices: next_id - FIRST_INVOICE_ID,
            fees_collected: config.fees_collected,
            fee_rate_bps: config.fee_rate_bps,
            min_discount_bps: config.min_discount_bps,
            max_discount_bps: config.max_discount_bps,
        }
    }

    /// Whether an invoice is currently overdue: Sold and strictly past its
    /// due height. Unknown ids are not overdue.
    pub fn is_invoice_overdue(env: Env, invoice_id: u64) -> bool {
        let invoices: Map<u64, Invoice> = env.storage().instance().get(&INVOICES_KEY).unwrap();
        match invoices.get(invoice_id) {
            Some(invoice) => {
                invoice.status == InvoiceStatus::Sold
                    && env.ledger().sequence() > invoice.due_height
            }
            None => false,
        }
    }

    /// Return on investment for an invoice in basis points, derived from
    /// its stored original and discounted amounts.
    ///
    /// # Errors
    /// - NotFound: no such invoice
    pub fn calculate_roi(env: Env, invoice_id: u64) -> Result<u32, Error> {
        let invoices: Map<u64, Invoice> = env.storage().instance().get(&INVOICES_KEY).unwrap();
        let invoice = invoices.get(invoice_id).ok_or(Error::NotFound)?;
        Ok(Self::_calculate_roi(
            invoice.original_amount,
            invoice.discounted_amount,
        ))
    }

    /// Returns the current admin address.
    pub fn get_admin(env: Env) -> Address {
        env.storage().persistent().get(&ADMIN_KEY).unwrap()
    }

    /// Returns the settlement token contract address.
    pub fn get_token_id(env: Env) -> Address {
        env.storage().persistent().get(&TOKEN_KEY).unwrap()
    }

    /// Returns the platform configuration singleton.
    pub fn get_platform_config(env: Env) -> PlatformConfig {
        Self::_config(&env)
    }

    /// Returns the id the next created invoice will receive.
    pub fn get_next_invoice_id(env: Env) -> u64 {
        env.storage().instance().get(&NEXT_INVOICE_ID_KEY).unwrap()
    }
}
