diesel::table! {
    trackers (id) {
        id -> Uuid,
        category -> Varchar,
        year -> Int2,
        last_number -> Int4,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        generate_id -> Varchar,
        name -> Varchar,
        email -> Varchar,
        role -> Varchar,
        supervisor -> Nullable<Uuid>,
        status -> Bool,
        deleted -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    customers (id) {
        id -> Uuid,
        generate_id -> Varchar,
        name -> Varchar,
        email -> Nullable<Varchar>,
        ic -> Nullable<Varchar>,
        passport -> Nullable<Varchar>,
        remark -> Nullable<Varchar>,
        created_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    loans (id) {
        id -> Uuid,
        generate_id -> Varchar,
        customer_id -> Uuid,
        agent_id -> Uuid,
        agent_2_id -> Nullable<Uuid>,
        principal_amount -> Numeric,
        deposit_amount -> Numeric,
        application_fee -> Numeric,
        interest -> Numeric,
        unit_of_date -> Varchar,
        date_period -> Int2,
        repayment_term -> Int2,
        repayment_date -> Date,
        loan_date -> Date,
        status -> Varchar,
        payment_per_term -> Nullable<Numeric>,
        estimated_profit -> Nullable<Numeric>,
        actual_profit -> Nullable<Numeric>,
        remark -> Nullable<Varchar>,
        created_by -> Uuid,
        created_at -> Timestamptz,
        deleted -> Bool,
    }
}

diesel::table! {
    installments (id) {
        id -> Uuid,
        generate_id -> Varchar,
        loan_id -> Uuid,
        installment_date -> Date,
        due_amount -> Nullable<Numeric>,
        status -> Nullable<Varchar>,
        receiving_date -> Nullable<Date>,
        deleted -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    payments (id) {
        id -> Uuid,
        generate_id -> Varchar,
        loan_id -> Uuid,
        installment_id -> Nullable<Uuid>,
        payment_type -> Varchar,
        amount -> Numeric,
        balance -> Nullable<Numeric>,
        account_details -> Nullable<Varchar>,
        remarks -> Nullable<Varchar>,
        payment_date -> Date,
        created_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    expenses (id) {
        id -> Uuid,
        user_id -> Uuid,
        year -> Int2,
        jan -> Numeric,
        feb -> Numeric,
        mar -> Numeric,
        apr -> Numeric,
        may -> Numeric,
        jun -> Numeric,
        jul -> Numeric,
        aug -> Numeric,
        sep -> Numeric,
        oct -> Numeric,
        nov -> Numeric,
        dec -> Numeric,
        deleted -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(loans -> customers (customer_id));
diesel::joinable!(installments -> loans (loan_id));
diesel::joinable!(payments -> loans (loan_id));
diesel::joinable!(expenses -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    trackers,
    users,
    customers,
    loans,
    installments,
    payments,
    expenses,
);
