use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wholesale_core::{
    AuditStamp, CustomerId, DomainError, DomainResult, Identity, OrderId, PersonId, StockItemId,
    guard, impl_entity, money,
};

use crate::line_financials::LineFinancials;

const MAX_PURCHASE_ORDER_NUMBER_LEN: usize = 20;
const MAX_DESCRIPTION_LEN: usize = 100;

/// Picking workflow state, derived from line pick quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Nothing picked yet (or no lines).
    Pending,
    /// At least one item picked, at least one line still short.
    Picking,
    /// Every line fully picked.
    Picked,
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Picking => "picking",
            OrderStatus::Picked => "picked",
        })
    }
}

/// Order line: stock item, description, financial snapshot and pick progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub stock_item_id: StockItemId,
    pub description: String,
    pub financials: LineFinancials,
    pub picked_quantity: u32,
    pub picking_completed_when: Option<DateTime<Utc>>,
}

impl OrderLine {
    pub fn quantity(&self) -> u32 {
        self.financials.quantity()
    }

    pub fn remaining_to_pick(&self) -> u32 {
        self.quantity().saturating_sub(self.picked_quantity)
    }

    pub fn is_fully_picked(&self) -> bool {
        self.picked_quantity >= self.quantity()
    }
}

/// Order-level sums over every line's [`LineFinancials`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    pub excluding_tax: Decimal,
    pub tax: Decimal,
    pub including_tax: Decimal,
    pub profit: Decimal,
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub customer_id: CustomerId,
    pub order_date: NaiveDate,
    pub expected_delivery_date: NaiveDate,
    pub customer_purchase_order_number: Option<String>,
    pub edited_by: PersonId,
}

/// Command: AddOrderLine (priced line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOrderLine {
    pub stock_item_id: StockItemId,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Option<Decimal>,
    pub tax_rate: Decimal,
    pub cost_price: Decimal,
}

/// Stored shape of an [`Order`], consumed by [`Order::restore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub order_date: NaiveDate,
    pub expected_delivery_date: NaiveDate,
    pub customer_purchase_order_number: Option<String>,
    pub lines: Vec<OrderLine>,
    pub picked_by: Option<PersonId>,
    pub picking_completed_when: Option<DateTime<Utc>>,
    pub last_edited_by: PersonId,
    pub last_edited_when: DateTime<Utc>,
}

/// Aggregate root: customer Order.
///
/// Lines can only be changed while the order is [`OrderStatus::Pending`]; once
/// picking starts the workflow only moves forward.
#[derive(Debug, Clone)]
pub struct Order {
    identity: Identity<OrderId>,
    customer_id: CustomerId,
    order_date: NaiveDate,
    expected_delivery_date: NaiveDate,
    customer_purchase_order_number: Option<String>,
    lines: Vec<OrderLine>,
    picked_by: Option<PersonId>,
    picking_completed_when: Option<DateTime<Utc>>,
    audit: AuditStamp,
}

impl_entity!(Order, OrderId);

impl Order {
    pub fn place(cmd: PlaceOrder) -> DomainResult<Self> {
        guard::not_in_future("order_date", cmd.order_date)?;
        ensure_delivery_after_order(cmd.order_date, cmd.expected_delivery_date)?;
        let po_number = guard::optional_text(
            "customer_purchase_order_number",
            cmd.customer_purchase_order_number.as_deref(),
            MAX_PURCHASE_ORDER_NUMBER_LEN,
        )?;

        Ok(Self {
            identity: Identity::unassigned(),
            customer_id: cmd.customer_id,
            order_date: cmd.order_date,
            expected_delivery_date: cmd.expected_delivery_date,
            customer_purchase_order_number: po_number,
            lines: Vec::new(),
            picked_by: None,
            picking_completed_when: None,
            audit: AuditStamp::now(cmd.edited_by),
        })
    }

    /// Rebuild a stored order, re-checking every invariant `place` and the
    /// line operations enforce.
    pub fn restore(record: OrderRecord) -> DomainResult<Self> {
        guard::not_in_future("order_date", record.order_date)?;
        ensure_delivery_after_order(record.order_date, record.expected_delivery_date)?;
        let po_number = guard::optional_text(
            "customer_purchase_order_number",
            record.customer_purchase_order_number.as_deref(),
            MAX_PURCHASE_ORDER_NUMBER_LEN,
        )?;

        let mut seen = HashSet::new();
        for line in &record.lines {
            if !seen.insert(line.line_no) {
                return Err(DomainError::invalid_argument(
                    "lines",
                    format!("duplicate line number {}", line.line_no),
                ));
            }
            guard::required_text("description", &line.description, MAX_DESCRIPTION_LEN)?;
            if line.picked_quantity > line.quantity() {
                return Err(DomainError::invalid_argument(
                    "picked_quantity",
                    format!(
                        "line {} has {} picked of {} ordered",
                        line.line_no,
                        line.picked_quantity,
                        line.quantity()
                    ),
                ));
            }
            if line.picking_completed_when.is_some() != line.is_fully_picked() {
                return Err(DomainError::invalid_argument(
                    "picking_completed_when",
                    format!(
                        "line {} completion stamp disagrees with {} of {} picked",
                        line.line_no,
                        line.picked_quantity,
                        line.quantity()
                    ),
                ));
            }
        }

        let all_picked = !record.lines.is_empty() && record.lines.iter().all(OrderLine::is_fully_picked);
        if record.picking_completed_when.is_some() != all_picked {
            return Err(DomainError::invalid_argument(
                "picking_completed_when",
                "must be set exactly when every line is fully picked",
            ));
        }
        if record.picked_by.is_some() != all_picked {
            return Err(DomainError::invalid_argument(
                "picked_by",
                "must be set exactly when every line is fully picked",
            ));
        }

        let mut order = Self {
            identity: Identity::unassigned(),
            customer_id: record.customer_id,
            order_date: record.order_date,
            expected_delivery_date: record.expected_delivery_date,
            customer_purchase_order_number: po_number,
            lines: record.lines,
            picked_by: record.picked_by,
            picking_completed_when: record.picking_completed_when,
            audit: AuditStamp::at(record.last_edited_by, record.last_edited_when),
        };
        order.identity.assign(record.id)?;
        Ok(order)
    }

    pub fn to_record(&self) -> Option<OrderRecord> {
        Some(OrderRecord {
            id: self.identity.get()?,
            customer_id: self.customer_id,
            order_date: self.order_date,
            expected_delivery_date: self.expected_delivery_date,
            customer_purchase_order_number: self.customer_purchase_order_number.clone(),
            lines: self.lines.clone(),
            picked_by: self.picked_by,
            picking_completed_when: self.picking_completed_when,
            last_edited_by: self.audit.last_edited_by(),
            last_edited_when: self.audit.last_edited_when(),
        })
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn order_date(&self) -> NaiveDate {
        self.order_date
    }

    pub fn expected_delivery_date(&self) -> NaiveDate {
        self.expected_delivery_date
    }

    pub fn customer_purchase_order_number(&self) -> Option<&str> {
        self.customer_purchase_order_number.as_deref()
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn line(&self, line_no: u32) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }

    pub fn picked_by(&self) -> Option<PersonId> {
        self.picked_by
    }

    pub fn picking_completed_when(&self) -> Option<DateTime<Utc>> {
        self.picking_completed_when
    }

    pub fn audit(&self) -> &AuditStamp {
        &self.audit
    }

    pub fn status(&self) -> OrderStatus {
        if self.lines.is_empty() {
            return OrderStatus::Pending;
        }
        if self.lines.iter().all(OrderLine::is_fully_picked) {
            OrderStatus::Picked
        } else if self.lines.iter().any(|l| l.picked_quantity > 0) {
            OrderStatus::Picking
        } else {
            OrderStatus::Pending
        }
    }

    pub fn is_picking(&self) -> bool {
        self.status() == OrderStatus::Picking
    }

    pub fn is_picked(&self) -> bool {
        self.status() == OrderStatus::Picked
    }

    pub fn is_modifiable(&self) -> bool {
        self.status() == OrderStatus::Pending
    }

    /// Sums over every line; fails with `InvalidArgument` if a sum overflows.
    pub fn totals(&self) -> DomainResult<OrderTotals> {
        self.lines.iter().try_fold(OrderTotals::default(), |acc, line| {
            let f = &line.financials;
            Ok(OrderTotals {
                excluding_tax: money::checked_add("extended_price", acc.excluding_tax, f.extended_price())?,
                tax: money::checked_add("tax_amount", acc.tax, f.tax_amount())?,
                including_tax: money::checked_add(
                    "extended_price",
                    acc.including_tax,
                    f.total_including_tax(),
                )?,
                profit: money::checked_add("line_profit", acc.profit, f.line_profit())?,
            })
        })
    }

    /// Add a priced line; returns its line number.
    pub fn add_line(&mut self, line: AddOrderLine, editor: PersonId) -> DomainResult<u32> {
        let financials =
            LineFinancials::calculate(line.quantity, line.unit_price, line.tax_rate, line.cost_price)?;
        self.push_line(line.stock_item_id, &line.description, financials, editor)
    }

    /// Add a free-of-charge line; returns its line number.
    pub fn add_free_items(
        &mut self,
        stock_item_id: StockItemId,
        description: &str,
        quantity: u32,
        cost_price: Option<Decimal>,
        editor: PersonId,
    ) -> DomainResult<u32> {
        let financials = LineFinancials::free_items(quantity, cost_price)?;
        self.push_line(stock_item_id, description, financials, editor)
    }

    pub fn change_line_quantity(
        &mut self,
        line_no: u32,
        quantity: u32,
        cost_price: Decimal,
        editor: PersonId,
    ) -> DomainResult<()> {
        self.ensure_modifiable()?;
        let line = self.line_mut(line_no)?;
        line.financials = line.financials.with_quantity(quantity, cost_price)?;
        tracing::debug!(line_no, quantity, "order line quantity changed");
        self.audit.touch(editor);
        Ok(())
    }

    pub fn change_line_unit_price(
        &mut self,
        line_no: u32,
        unit_price: Option<Decimal>,
        cost_price: Decimal,
        editor: PersonId,
    ) -> DomainResult<()> {
        self.ensure_modifiable()?;
        let line = self.line_mut(line_no)?;
        line.financials = line.financials.with_unit_price(unit_price, cost_price)?;
        tracing::debug!(line_no, ?unit_price, "order line repriced");
        self.audit.touch(editor);
        Ok(())
    }

    pub fn remove_line(&mut self, line_no: u32, editor: PersonId) -> DomainResult<()> {
        self.ensure_modifiable()?;
        let idx = self
            .lines
            .iter()
            .position(|l| l.line_no == line_no)
            .ok_or_else(|| unknown_line(line_no))?;
        self.lines.remove(idx);
        self.audit.touch(editor);
        Ok(())
    }

    /// Record `quantity` more items picked for a line.
    ///
    /// The line is stamped complete when it reaches its ordered quantity; the
    /// order is stamped (with `editor` as picker) when its last line does.
    pub fn record_pick(&mut self, line_no: u32, quantity: u32, editor: PersonId) -> DomainResult<()> {
        if self.is_picked() {
            return Err(DomainError::illegal_state("order is already fully picked"));
        }
        guard::positive_quantity("quantity", quantity)?;

        let now = Utc::now();
        let line = self.line_mut(line_no)?;
        let remaining = line.remaining_to_pick();
        if quantity > remaining {
            return Err(DomainError::invalid_argument(
                "quantity",
                format!("line {line_no} has only {remaining} left to pick (got {quantity})"),
            ));
        }
        line.picked_quantity += quantity;
        if line.is_fully_picked() {
            line.picking_completed_when = Some(now);
        }

        if self.is_picked() {
            self.picked_by = Some(editor);
            self.picking_completed_when = Some(now);
            tracing::info!(order_id = ?self.identity.get(), picked_by = %editor, "order fully picked");
        }
        self.audit.touch(editor);
        Ok(())
    }

    fn push_line(
        &mut self,
        stock_item_id: StockItemId,
        description: &str,
        financials: LineFinancials,
        editor: PersonId,
    ) -> DomainResult<u32> {
        self.ensure_modifiable()?;
        let description = guard::required_text("description", description, MAX_DESCRIPTION_LEN)?;
        let line_no = self.lines.iter().map(|l| l.line_no).max().unwrap_or(0) + 1;

        tracing::debug!(line_no, %stock_item_id, extended_price = %financials.extended_price(), "order line added");
        self.lines.push(OrderLine {
            line_no,
            stock_item_id,
            description,
            financials,
            picked_quantity: 0,
            picking_completed_when: None,
        });
        self.audit.touch(editor);
        Ok(line_no)
    }

    fn ensure_modifiable(&self) -> DomainResult<()> {
        if !self.is_modifiable() {
            return Err(DomainError::illegal_state(
                "order lines cannot change once picking has started",
            ));
        }
        Ok(())
    }

    fn line_mut(&mut self, line_no: u32) -> DomainResult<&mut OrderLine> {
        self.lines
            .iter_mut()
            .find(|l| l.line_no == line_no)
            .ok_or_else(|| unknown_line(line_no))
    }
}

fn ensure_delivery_after_order(order_date: NaiveDate, expected: NaiveDate) -> DomainResult<()> {
    if expected < order_date {
        return Err(DomainError::invalid_argument(
            "expected_delivery_date",
            format!("{expected} is before the order date {order_date}"),
        ));
    }
    Ok(())
}

fn unknown_line(line_no: u32) -> DomainError {
    DomainError::invalid_argument("line_no", format!("order has no line {line_no}"))
}
