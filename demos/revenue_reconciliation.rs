//! A week of agency books: reconciled sales, vendor payments, GST and reports

use agency_books::{
    ActivityQuery, AmountField, Amounts, Books, BooksConfig, ExpenseDraft, MemoryStorage,
    PaymentMode, RevenueDraft, RevenueSource, RevenueUpdate, VendorCategory, VendorCost,
    VendorPayment,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧾 Agency Books - Revenue Reconciliation Example\n");

    let mut books = Books::open(MemoryStorage::new(), BooksConfig::default()).await?;
    books.set_user("front-desk");

    // 1. What the revenue form shows while the operator types
    println!("🔁 Reconciling form amounts...");
    let typed = Amounts::new(
        BigDecimal::from(50000),
        BigDecimal::from(20000),
        BigDecimal::from(0),
    );
    let preview = books.preview_amounts(&typed, AmountField::ReceivedAmount);
    println!(
        "  Sale ₹{} | Received ₹{} | Pending ₹{} -> {:?}",
        preview.amounts.sale_price,
        preview.amounts.received_amount,
        preview.amounts.pending_amount,
        preview.status
    );
    println!();

    // 2. A Goa package with two suppliers, part paid by the client
    println!("💰 Recording sales...");
    let goa = books
        .create_revenue(
            RevenueDraft::new(day(1), "Asha Menon", RevenueSource::Package, BigDecimal::from(50000))
                .received(BigDecimal::from(20000))
                .payment_mode(PaymentMode::Upi)
                .cost(VendorCost::new(
                    "Hotel ABC",
                    VendorCategory::Hotel,
                    BigDecimal::from(30000),
                ))
                .cost(VendorCost::new(
                    "IndiGo",
                    VendorCategory::Flight,
                    BigDecimal::from(12000),
                )),
        )
        .await?;
    println!(
        "  ✓ Goa package: profit ₹{} ({}% margin), {:?}",
        goa.profit, goa.profit_margin, goa.status
    );

    let visa = books
        .create_revenue(
            RevenueDraft::new(day(2), "Ravi Kumar", RevenueSource::Visa, BigDecimal::from(2360))
                .received(BigDecimal::from(2360)),
        )
        .await?;
    println!("  ✓ Visa fee: {:?}", visa.status);

    // 3. The client pays the balance, the agency pays its suppliers
    println!("\n🏦 Settling payments...");
    let goa = books
        .update_revenue(
            &goa.id,
            RevenueUpdate {
                received_amount: Some(BigDecimal::from(50000)),
                ..Default::default()
            },
        )
        .await?;
    println!("  ✓ Client balance received: {:?}", goa.status);

    let hotel_id = goa.cost_price_details[0].id.clone();
    books
        .record_vendor_payment(
            &goa.id,
            &hotel_id,
            VendorPayment::new(day(3), BigDecimal::from(30000), PaymentMode::BankTransfer),
        )
        .await?;
    println!("  ✓ Paid Hotel ABC ₹30000");

    books
        .create_expense(ExpenseDraft::new(day(5), "Office Rent", BigDecimal::from(15000)))
        .await?;
    println!("  ✓ Office rent ₹15000");

    // 4. GST and the ledger
    println!("\n📊 GST and ledger...");
    let invoice = books.gst_invoice(&visa.id).await?;
    println!(
        "  Invoice {}: taxable ₹{} + CGST ₹{} + SGST ₹{} = ₹{}",
        invoice.invoice_number, invoice.taxable_amount, invoice.cgst, invoice.sgst, invoice.total_amount
    );

    let gst = books.gst_summary(None, None).await?;
    println!("  Output GST ₹{} | Net payable ₹{}", gst.output_gst.total, gst.net_gst_payable);

    let trial_balance = books.trial_balance(None).await?;
    println!(
        "  Trial balance: ₹{} / ₹{} {}",
        trial_balance.total_debits,
        trial_balance.total_credits,
        if trial_balance.is_balanced { "✅" } else { "❌" }
    );

    // 5. Reports
    println!("\n📈 Reports...");
    let dashboard = books.dashboard_summary().await?;
    println!(
        "  Collected ₹{} | Expenses ₹{} | Net ₹{}",
        dashboard.total_revenue, dashboard.total_expenses, dashboard.net_profit
    );
    for payable in books.vendor_payables().await? {
        println!("  Still owed to {}: ₹{}", payable.vendor_name, payable.pending);
    }
    for vendor in books.vendor_business().await? {
        println!(
            "  {}: ₹{} over {} booking(s)",
            vendor.vendor_name, vendor.total_business, vendor.transaction_count
        );
    }

    println!("\n📝 Activity:");
    for entry in books.activity_logs(&ActivityQuery::default().limit(5)).await? {
        println!("  [{}] {} {}", entry.action, entry.module, entry.description);
    }

    Ok(())
}
