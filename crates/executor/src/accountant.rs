use crate::error::ExecutorError;
use core_types::{CoreError, Fill, Holding, Portfolio};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Applies a Buy fill to the user's holding and portfolio.
///
/// This is the core state transition for the buy side: the holding's average
/// cost becomes the quantity-weighted average of the old position and the new
/// fill, the balance is debited by the executed amount plus commission, and
/// invested capital grows by the executed amount.
///
/// The caller has already validated funds; a debit that would still drive the
/// balance negative is an invariant breach, not a business rejection.
pub fn apply_buy(
    holding: Option<Holding>,
    mut portfolio: Portfolio,
    user_id: Uuid,
    symbol: &str,
    fill: &Fill,
) -> Result<(Holding, Portfolio), ExecutorError> {
    let debit = fill.total_amount + fill.commission;
    if portfolio.virtual_balance < debit {
        return Err(CoreError::InvariantViolation(format!(
            "buy debit {} exceeds balance {} for user {}",
            debit, portfolio.virtual_balance, user_id
        ))
        .into());
    }

    let holding = match holding {
        None => Holding::open(user_id, symbol, fill.quantity, fill.price),
        Some(mut position) => {
            let total_quantity = position.quantity + fill.quantity;
            position.average_cost = (position.quantity * position.average_cost
                + fill.quantity * fill.price)
                / total_quantity;
            position.quantity = total_quantity;
            position.total_cost = position.quantity * position.average_cost;
            position
        }
    };

    portfolio.virtual_balance -= debit;
    portfolio.total_invested += fill.total_amount;

    Ok((holding, portfolio))
}

/// Applies a Sell fill to the user's holding and portfolio, returning the
/// realized PnL of the liquidated quantity.
///
/// The average cost is left untouched on sells; realized PnL is
/// `(price - average_cost) * quantity` and is recorded on the trade, not the
/// holding. Invested capital shrinks by the cost basis of what was sold,
/// floored at zero.
pub fn apply_sell(
    mut holding: Holding,
    mut portfolio: Portfolio,
    fill: &Fill,
) -> Result<(Holding, Portfolio, Decimal), ExecutorError> {
    if holding.quantity < fill.quantity {
        return Err(CoreError::InvariantViolation(format!(
            "sell of {} exceeds held quantity {} for {}",
            fill.quantity, holding.quantity, holding.symbol
        ))
        .into());
    }

    let realized_pnl = (fill.price - holding.average_cost) * fill.quantity;
    let cost_basis = holding.average_cost * fill.quantity;

    holding.quantity -= fill.quantity;
    holding.total_cost = holding.quantity * holding.average_cost;

    portfolio.virtual_balance += fill.total_amount - fill.commission;
    portfolio.total_invested = (portfolio.total_invested - cost_basis).max(Decimal::ZERO);

    Ok((holding, portfolio, realized_pnl))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fill(quantity: Decimal, price: Decimal, commission: Decimal) -> Fill {
        Fill {
            quantity,
            price,
            total_amount: quantity * price,
            commission,
        }
    }

    fn portfolio_with(balance: Decimal, invested: Decimal) -> Portfolio {
        let mut portfolio = Portfolio::new(Uuid::new_v4(), balance);
        portfolio.total_invested = invested;
        portfolio
    }

    #[test]
    fn first_buy_opens_the_position_at_fill_price() {
        let user_id = Uuid::new_v4();
        let portfolio = portfolio_with(dec!(100000), dec!(0));

        let (holding, portfolio) =
            apply_buy(None, portfolio, user_id, "BTCUSDT", &fill(dec!(2), dec!(50000), dec!(100)))
                .unwrap();

        assert_eq!(holding.quantity, dec!(2));
        assert_eq!(holding.average_cost, dec!(50000));
        assert_eq!(holding.total_cost, dec!(100000));
        assert_eq!(portfolio.virtual_balance, dec!(100000) - dec!(100100));
        assert_eq!(portfolio.total_invested, dec!(100000));
    }

    #[test]
    fn subsequent_buys_average_the_cost_by_quantity() {
        let user_id = Uuid::new_v4();
        let (holding, portfolio) = apply_buy(
            None,
            portfolio_with(dec!(1000), dec!(0)),
            user_id,
            "ETHUSDT",
            &fill(dec!(1), dec!(100), dec!(0)),
        )
        .unwrap();

        let (holding, _portfolio) = apply_buy(
            Some(holding),
            portfolio,
            user_id,
            "ETHUSDT",
            &fill(dec!(3), dec!(140), dec!(0)),
        )
        .unwrap();

        // (1*100 + 3*140) / 4 = 130
        assert_eq!(holding.quantity, dec!(4));
        assert_eq!(holding.average_cost, dec!(130));
        assert_eq!(holding.total_cost, dec!(520));
    }

    #[test]
    fn buy_that_would_overdraw_is_an_invariant_breach() {
        let result = apply_buy(
            None,
            portfolio_with(dec!(100), dec!(0)),
            Uuid::new_v4(),
            "BTCUSDT",
            &fill(dec!(1), dec!(50000), dec!(50)),
        );
        assert!(matches!(
            result,
            Err(ExecutorError::Validation(CoreError::InvariantViolation(_)))
        ));
    }

    #[test]
    fn sell_keeps_average_cost_and_realizes_pnl() {
        let user_id = Uuid::new_v4();
        let holding = Holding::open(user_id, "BTCUSDT", dec!(2), dec!(50000));
        let portfolio = portfolio_with(dec!(0), dec!(100000));

        let (holding, portfolio, realized) =
            apply_sell(holding, portfolio, &fill(dec!(1), dec!(55000), dec!(55))).unwrap();

        assert_eq!(realized, dec!(5000));
        assert_eq!(holding.quantity, dec!(1));
        assert_eq!(holding.average_cost, dec!(50000));
        assert_eq!(holding.total_cost, dec!(50000));
        assert_eq!(portfolio.virtual_balance, dec!(55000) - dec!(55));
        assert_eq!(portfolio.total_invested, dec!(50000));
    }

    #[test]
    fn full_liquidation_leaves_a_zero_quantity_row() {
        let user_id = Uuid::new_v4();
        let holding = Holding::open(user_id, "BTCUSDT", dec!(1), dec!(50000));
        let portfolio = portfolio_with(dec!(0), dec!(50000));

        let (holding, portfolio, _) =
            apply_sell(holding, portfolio, &fill(dec!(1), dec!(48000), dec!(48))).unwrap();

        assert_eq!(holding.quantity, dec!(0));
        assert_eq!(holding.total_cost, dec!(0));
        assert_eq!(portfolio.total_invested, dec!(0));
    }

    #[test]
    fn invested_capital_is_floored_at_zero() {
        let user_id = Uuid::new_v4();
        let holding = Holding::open(user_id, "BTCUSDT", dec!(1), dec!(50000));
        // Invested tracker drifted low; a sell must not push it negative.
        let portfolio = portfolio_with(dec!(0), dec!(10000));

        let (_, portfolio, _) =
            apply_sell(holding, portfolio, &fill(dec!(1), dec!(50000), dec!(0))).unwrap();

        assert_eq!(portfolio.total_invested, dec!(0));
    }

    #[test]
    fn oversell_is_an_invariant_breach() {
        let user_id = Uuid::new_v4();
        let holding = Holding::open(user_id, "BTCUSDT", dec!(1), dec!(50000));
        let result = apply_sell(
            holding,
            portfolio_with(dec!(0), dec!(50000)),
            &fill(dec!(2), dec!(50000), dec!(0)),
        );
        assert!(matches!(
            result,
            Err(ExecutorError::Validation(CoreError::InvariantViolation(_)))
        ));
    }
}
