use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wholesale_core::{
    AuditStamp, CustomerId, DomainError, DomainResult, Identity, PersonId, guard, impl_entity,
};

const MAX_NAME_LEN: usize = 100;
const MAX_PAYMENT_DAYS: u32 = 365;

/// Credit hold lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditStatus {
    NotOnHold,
    OnHold,
}

/// Contact channels for a customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ContactDetails {
    pub phone_number: Option<String>,
    pub fax_number: Option<String>,
    pub email_address: Option<String>,
    pub website_url: Option<String>,
}

/// Command: RegisterCustomer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCustomer {
    pub name: String,
    /// `None` means no credit limit.
    pub credit_limit: Option<Decimal>,
    pub standard_discount_percentage: Decimal,
    pub payment_days: u32,
    pub account_opened_date: NaiveDate,
    pub contact: Option<ContactDetails>,
    pub edited_by: PersonId,
}

/// Stored shape of a [`Customer`], consumed by [`Customer::restore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub name: String,
    pub credit_limit: Option<Decimal>,
    pub standard_discount_percentage: Decimal,
    pub payment_days: u32,
    pub is_on_credit_hold: bool,
    pub account_opened_date: NaiveDate,
    pub contact: ContactDetails,
    pub last_edited_by: PersonId,
    pub last_edited_when: DateTime<Utc>,
}

/// Aggregate root: Customer.
#[derive(Debug, Clone)]
pub struct Customer {
    identity: Identity<CustomerId>,
    name: String,
    credit_limit: Option<Decimal>,
    standard_discount_percentage: Decimal,
    payment_days: u32,
    is_on_credit_hold: bool,
    account_opened_date: NaiveDate,
    contact: ContactDetails,
    audit: AuditStamp,
}

impl_entity!(Customer, CustomerId);

impl Customer {
    pub fn register(cmd: RegisterCustomer) -> DomainResult<Self> {
        Self::build(
            &cmd.name,
            cmd.credit_limit,
            cmd.standard_discount_percentage,
            cmd.payment_days,
            false,
            cmd.account_opened_date,
            cmd.contact.unwrap_or_default(),
            AuditStamp::now(cmd.edited_by),
        )
    }

    pub fn restore(record: CustomerRecord) -> DomainResult<Self> {
        let mut customer = Self::build(
            &record.name,
            record.credit_limit,
            record.standard_discount_percentage,
            record.payment_days,
            record.is_on_credit_hold,
            record.account_opened_date,
            record.contact,
            AuditStamp::at(record.last_edited_by, record.last_edited_when),
        )?;
        customer.identity.assign(record.id)?;
        Ok(customer)
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        name: &str,
        credit_limit: Option<Decimal>,
        standard_discount_percentage: Decimal,
        payment_days: u32,
        is_on_credit_hold: bool,
        account_opened_date: NaiveDate,
        contact: ContactDetails,
        audit: AuditStamp,
    ) -> DomainResult<Self> {
        let name = guard::required_text("name", name, MAX_NAME_LEN)?;
        if let Some(limit) = credit_limit {
            guard::non_negative("credit_limit", limit)?;
        }
        guard::percentage("standard_discount_percentage", standard_discount_percentage)?;
        ensure_payment_days(payment_days)?;
        guard::not_in_future("account_opened_date", account_opened_date)?;

        Ok(Self {
            identity: Identity::unassigned(),
            name,
            credit_limit,
            standard_discount_percentage,
            payment_days,
            is_on_credit_hold,
            account_opened_date,
            contact,
            audit,
        })
    }

    pub fn to_record(&self) -> Option<CustomerRecord> {
        Some(CustomerRecord {
            id: self.identity.get()?,
            name: self.name.clone(),
            credit_limit: self.credit_limit,
            standard_discount_percentage: self.standard_discount_percentage,
            payment_days: self.payment_days,
            is_on_credit_hold: self.is_on_credit_hold,
            account_opened_date: self.account_opened_date,
            contact: self.contact.clone(),
            last_edited_by: self.audit.last_edited_by(),
            last_edited_when: self.audit.last_edited_when(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn credit_limit(&self) -> Option<Decimal> {
        self.credit_limit
    }

    pub fn standard_discount_percentage(&self) -> Decimal {
        self.standard_discount_percentage
    }

    pub fn payment_days(&self) -> u32 {
        self.payment_days
    }

    pub fn account_opened_date(&self) -> NaiveDate {
        self.account_opened_date
    }

    pub fn contact(&self) -> &ContactDetails {
        &self.contact
    }

    pub fn audit(&self) -> &AuditStamp {
        &self.audit
    }

    pub fn is_on_credit_hold(&self) -> bool {
        self.is_on_credit_hold
    }

    pub fn credit_status(&self) -> CreditStatus {
        if self.is_on_credit_hold {
            CreditStatus::OnHold
        } else {
            CreditStatus::NotOnHold
        }
    }

    pub fn place_on_credit_hold(&mut self, editor: PersonId) -> DomainResult<()> {
        if self.is_on_credit_hold {
            return Err(DomainError::illegal_state("customer is already on credit hold"));
        }
        self.is_on_credit_hold = true;
        self.audit.touch(editor);
        tracing::info!(customer_id = ?self.identity.get(), %editor, "customer placed on credit hold");
        Ok(())
    }

    pub fn release_credit_hold(&mut self, editor: PersonId) -> DomainResult<()> {
        if !self.is_on_credit_hold {
            return Err(DomainError::illegal_state("customer is not on credit hold"));
        }
        self.is_on_credit_hold = false;
        self.audit.touch(editor);
        tracing::info!(customer_id = ?self.identity.get(), %editor, "customer credit hold released");
        Ok(())
    }

    pub fn rename(&mut self, name: &str, editor: PersonId) -> DomainResult<()> {
        self.name = guard::required_text("name", name, MAX_NAME_LEN)?;
        self.audit.touch(editor);
        Ok(())
    }

    pub fn update_credit_limit(
        &mut self,
        credit_limit: Option<Decimal>,
        editor: PersonId,
    ) -> DomainResult<()> {
        if let Some(limit) = credit_limit {
            guard::non_negative("credit_limit", limit)?;
        }
        self.credit_limit = credit_limit;
        self.audit.touch(editor);
        Ok(())
    }

    pub fn update_contact_details(&mut self, contact: ContactDetails, editor: PersonId) {
        self.contact = contact;
        self.audit.touch(editor);
    }

    /// Credit still available given the customer's current `outstanding`
    /// balance. `None` when the customer has no credit limit.
    pub fn available_credit(&self, outstanding: Decimal) -> Option<Decimal> {
        self.credit_limit
            .map(|limit| limit.saturating_sub(outstanding).max(Decimal::ZERO))
    }

    /// Check that a new order for `order_total` may be accepted.
    pub fn ensure_can_place_order(
        &self,
        order_total: Decimal,
        outstanding: Decimal,
    ) -> DomainResult<()> {
        guard::non_negative("order_total", order_total)?;
        if self.is_on_credit_hold {
            return Err(DomainError::illegal_state(
                "customer is on credit hold and cannot place orders",
            ));
        }
        if let Some(limit) = self.credit_limit {
            if outstanding.saturating_add(order_total) > limit {
                return Err(DomainError::illegal_state(format!(
                    "order of {order_total} would exceed the credit limit of {limit} (outstanding {outstanding})"
                )));
            }
        }
        Ok(())
    }
}

fn ensure_payment_days(payment_days: u32) -> DomainResult<()> {
    if payment_days > MAX_PAYMENT_DAYS {
        return Err(DomainError::invalid_argument(
            "payment_days",
            format!("cannot exceed {MAX_PAYMENT_DAYS} (got {payment_days})"),
        ));
    }
    Ok(())
}
